use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::messages::{MessageRequest, MessageResponse};
use crate::api::schemas::page::PageQuery;
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_messages(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let messages = state.message_service.list(&auth_user.actor, query.into()).await?;
    Ok(Json(messages.into_iter().map(MessageResponse::from).collect::<Vec<_>>()))
}

pub async fn create_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<MessageRequest>,
) -> Result<impl IntoResponse> {
    let message = state.message_service.create(&auth_user.actor, &payload.subject, &payload.body).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

pub async fn get_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let message = state.message_service.get(&auth_user.actor, id).await?;
    Ok(Json(MessageResponse::from(message)))
}

pub async fn update_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MessageRequest>,
) -> Result<impl IntoResponse> {
    let message = state.message_service.update(&auth_user.actor, id, &payload.subject, &payload.body).await?;
    Ok(Json(MessageResponse::from(message)))
}

pub async fn delete_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.message_service.delete(&auth_user.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
