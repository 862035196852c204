use crate::domain::message::Message;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct MessageRecord {
    pub(crate) id: Uuid,
    pub(crate) owner_id: Uuid,
    pub(crate) subject: String,
    pub(crate) body: String,
    pub(crate) created_at: Option<OffsetDateTime>,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            owner_id: record.owner_id,
            subject: record.subject,
            body: record.body,
            created_at: record.created_at,
        }
    }
}
