use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::mailings::{MailingRequest, MailingResponse, SendReportResponse};
use crate::api::schemas::page::PageQuery;
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_mailings(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let mailings = state.mailing_service.list(&auth_user.actor, query.into()).await?;
    Ok(Json(mailings.into_iter().map(MailingResponse::from).collect::<Vec<_>>()))
}

pub async fn create_mailing(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<MailingRequest>,
) -> Result<impl IntoResponse> {
    let mailing = state.mailing_service.create(&auth_user.actor, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(MailingResponse::from(mailing))))
}

pub async fn get_mailing(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let detail = state.mailing_service.get(&auth_user.actor, id).await?;
    Ok(Json(MailingResponse::from(detail)))
}

pub async fn update_mailing(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MailingRequest>,
) -> Result<impl IntoResponse> {
    let mailing = state.mailing_service.update(&auth_user.actor, id, payload.into()).await?;
    Ok(Json(MailingResponse::from(mailing)))
}

pub async fn delete_mailing(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.mailing_service.delete(&auth_user.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn send_mailing(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let report = state.mailing_service.send(&auth_user.actor, id).await?;
    Ok(Json(SendReportResponse::from(report)))
}

pub async fn disable_mailing(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let mailing = state.mailing_service.disable(&auth_user.actor, id).await?;
    Ok(Json(MailingResponse::from(mailing)))
}
