use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::error::Result;
use axum::{Json, extract::State, response::IntoResponse};

pub async fn dashboard(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.stats_service.dashboard(&auth_user.actor).await?))
}
