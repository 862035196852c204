use crate::domain::recipient::Recipient;
use crate::services::recipient_service::RecipientDraft;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientRequest {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub comment: String,
}

impl From<RecipientRequest> for RecipientDraft {
    fn from(request: RecipientRequest) -> Self {
        Self { email: request.email, full_name: request.full_name, comment: request.comment }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl From<Recipient> for RecipientResponse {
    fn from(r: Recipient) -> Self {
        Self {
            id: r.id,
            owner_id: r.owner_id,
            email: r.email,
            full_name: r.full_name,
            comment: r.comment,
            created_at: r.created_at,
        }
    }
}
