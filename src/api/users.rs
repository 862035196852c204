use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::page::PageQuery;
use crate::api::schemas::users::{ProfileUpdate, UserResponse};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let users = state.user_service.list(&auth_user.actor, query.into()).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect::<Vec<_>>()))
}

pub async fn get_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let profile = state.user_service.get(&auth_user.actor, id).await?;
    Ok(Json(UserResponse::from(profile)))
}

pub async fn update_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.update_email(&auth_user.actor, id, &payload.email).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn block_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.user_service.set_active(&auth_user.actor, id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unblock_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.user_service.set_active(&auth_user.actor, id, true).await?;
    Ok(StatusCode::NO_CONTENT)
}
