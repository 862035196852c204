use crate::domain::delivery::{DeliveryAttempt, DeliveryOutcome};
use crate::domain::page::Page;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptQuery {
    pub mailing_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AttemptQuery {
    #[must_use]
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResponse {
    pub id: Uuid,
    pub mailing_id: Uuid,
    pub recipient_id: Option<Uuid>,
    pub recipient_email: String,
    pub outcome: DeliveryOutcome,
    pub response: String,
    #[serde(with = "time::serde::rfc3339")]
    pub attempted_at: OffsetDateTime,
}

impl From<DeliveryAttempt> for AttemptResponse {
    fn from(a: DeliveryAttempt) -> Self {
        Self {
            id: a.id,
            mailing_id: a.mailing_id,
            recipient_id: a.recipient_id,
            recipient_email: a.recipient_email,
            outcome: a.outcome,
            response: a.response,
            attempted_at: a.attempted_at,
        }
    }
}
