use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::attempts::{AttemptQuery, AttemptResponse};
use crate::error::Result;
use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

pub async fn list_attempts(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AttemptQuery>,
) -> Result<impl IntoResponse> {
    let attempts = state.delivery_service.list(&auth_user.actor, query.mailing_id, query.page()).await?;
    Ok(Json(attempts.into_iter().map(AttemptResponse::from).collect::<Vec<_>>()))
}
