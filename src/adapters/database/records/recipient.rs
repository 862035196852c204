use crate::domain::recipient::Recipient;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct RecipientRecord {
    pub(crate) id: Uuid,
    pub(crate) owner_id: Uuid,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) comment: String,
    pub(crate) created_at: Option<OffsetDateTime>,
}

impl From<RecipientRecord> for Recipient {
    fn from(record: RecipientRecord) -> Self {
        Self {
            id: record.id,
            owner_id: record.owner_id,
            email: record.email,
            full_name: record.full_name,
            comment: record.comment,
            created_at: record.created_at,
        }
    }
}
