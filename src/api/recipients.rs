use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::page::PageQuery;
use crate::api::schemas::recipients::{RecipientRequest, RecipientResponse};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_recipients(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let recipients = state.recipient_service.list(&auth_user.actor, query.into()).await?;
    Ok(Json(recipients.into_iter().map(RecipientResponse::from).collect::<Vec<_>>()))
}

pub async fn create_recipient(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RecipientRequest>,
) -> Result<impl IntoResponse> {
    let recipient = state.recipient_service.create(&auth_user.actor, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(RecipientResponse::from(recipient))))
}

pub async fn get_recipient(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let recipient = state.recipient_service.get(&auth_user.actor, id).await?;
    Ok(Json(RecipientResponse::from(recipient)))
}

pub async fn update_recipient(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipientRequest>,
) -> Result<impl IntoResponse> {
    let recipient = state.recipient_service.update(&auth_user.actor, id, payload.into()).await?;
    Ok(Json(RecipientResponse::from(recipient)))
}

pub async fn delete_recipient(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.recipient_service.delete(&auth_user.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
