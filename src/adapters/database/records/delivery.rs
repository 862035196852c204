use crate::domain::delivery::{DeliveryAttempt, DeliveryOutcome};
use sqlx::FromRow;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct DeliveryAttemptRecord {
    pub(crate) id: Uuid,
    pub(crate) mailing_id: Uuid,
    pub(crate) recipient_id: Option<Uuid>,
    pub(crate) recipient_email: String,
    pub(crate) outcome: String,
    pub(crate) response: String,
    pub(crate) attempted_at: OffsetDateTime,
}

impl From<DeliveryAttemptRecord> for DeliveryAttempt {
    fn from(record: DeliveryAttemptRecord) -> Self {
        Self {
            id: record.id,
            mailing_id: record.mailing_id,
            recipient_id: record.recipient_id,
            recipient_email: record.recipient_email,
            outcome: DeliveryOutcome::from_str(&record.outcome).unwrap_or(DeliveryOutcome::Failure),
            response: record.response,
            attempted_at: record.attempted_at,
        }
    }
}
