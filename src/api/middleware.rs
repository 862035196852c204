use crate::api::AppState;
use crate::domain::user::Actor;
use crate::error::AppError;
use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, Request, header, request::Parts},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// The authenticated principal of a request.
///
/// Resolution reloads the user on every request, so blocked accounts and
/// revoked permissions take effect immediately.
#[derive(Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub actor: Actor,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts.headers.get(header::AUTHORIZATION).ok_or(AppError::AuthError)?;
        let auth_str = auth_header.to_str().map_err(|_| AppError::AuthError)?;
        let token = auth_str.strip_prefix("Bearer ").ok_or(AppError::AuthError)?;

        let actor = state.auth_service.authenticate(token).await?;
        let user_id = actor.user_id().ok_or(AppError::AuthError)?;
        tracing::Span::current().record("user_id", tracing::field::display(user_id));

        Ok(Self { user_id, actor })
    }
}

/// Keeps a caller-supplied `x-request-id` and generates a UUID otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeRequestUuidOrHeader;

impl MakeRequestId for MakeRequestUuidOrHeader {
    fn make_request_id<B>(&mut self, request: &Request<B>) -> Option<RequestId> {
        let supplied = request
            .headers()
            .get("x-request-id")
            .filter(|v| v.to_str().is_ok_and(|s| !s.is_empty() && s.len() <= 128))
            .cloned();

        let value = supplied.or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok())?;
        Some(RequestId::new(value))
    }
}
