use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::auth::{AuthSession, Login, Logout, Refresh, Registration};
use crate::error::Result;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

pub async fn register(State(state): State<AppState>, Json(payload): Json<Registration>) -> Result<impl IntoResponse> {
    let session = state.account_service.register(&payload.username, &payload.email, &payload.password).await?;
    Ok((StatusCode::CREATED, Json(AuthSession::from(session))))
}

pub async fn login(State(state): State<AppState>, Json(payload): Json<Login>) -> Result<impl IntoResponse> {
    let session = state.account_service.login(&payload.username, &payload.password).await?;
    Ok(Json(AuthSession::from(session)))
}

pub async fn refresh(State(state): State<AppState>, Json(payload): Json<Refresh>) -> Result<impl IntoResponse> {
    let session = state.account_service.refresh(&payload.refresh_token).await?;
    Ok(Json(AuthSession::from(session)))
}

pub async fn logout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<Logout>,
) -> Result<impl IntoResponse> {
    state.account_service.logout(auth_user.user_id, &payload.refresh_token).await?;
    Ok(StatusCode::OK)
}
