use crate::domain::auth::AuthSession as DomainAuthSession;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refresh {
    pub refresh_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Logout {
    pub refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

impl From<DomainAuthSession> for AuthSession {
    fn from(session: DomainAuthSession) -> Self {
        Self { token: session.token, refresh_token: session.refresh_token, expires_at: session.expires_at }
    }
}
