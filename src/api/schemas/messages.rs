use crate::domain::message::Message;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct MessageRequest {
    pub subject: String,
    pub body: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub subject: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self { id: m.id, owner_id: m.owner_id, subject: m.subject, body: m.body, created_at: m.created_at }
    }
}
