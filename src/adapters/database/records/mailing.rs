use crate::domain::mailing::{Mailing, MailingStatus, Window, WindowPhase};
use sqlx::FromRow;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct MailingRecord {
    pub(crate) id: Uuid,
    pub(crate) owner_id: Uuid,
    pub(crate) message_id: Uuid,
    pub(crate) start_at: OffsetDateTime,
    pub(crate) end_at: OffsetDateTime,
    pub(crate) status: String,
    pub(crate) recipient_ids: Vec<Uuid>,
    pub(crate) created_at: Option<OffsetDateTime>,
}

impl From<MailingRecord> for Mailing {
    fn from(record: MailingRecord) -> Self {
        // Unknown text is re-derived from the window on the next read.
        let status = MailingStatus::from_str(&record.status).unwrap_or_else(|_| {
            tracing::warn!(mailing_id = %record.id, status = %record.status, "Unrecognised stored mailing status");
            MailingStatus::Scheduled(WindowPhase::Created)
        });

        Self {
            id: record.id,
            owner_id: record.owner_id,
            message_id: record.message_id,
            window: Window::from_stored(record.start_at, record.end_at),
            status,
            recipient_ids: record.recipient_ids,
            created_at: record.created_at,
        }
    }
}
