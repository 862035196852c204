use crate::domain::delivery::AttemptSummary;
use crate::domain::mailing::{Mailing, MailingStatus, SendReport};
use crate::services::mailing_service::{MailingDetail, MailingDraft};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailingRequest {
    pub message_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    #[serde(default)]
    pub recipient_ids: Vec<Uuid>,
}

impl From<MailingRequest> for MailingDraft {
    fn from(request: MailingRequest) -> Self {
        Self {
            message_id: request.message_id,
            start: request.start,
            end: request.end,
            recipient_ids: request.recipient_ids,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptTally {
    pub success: i64,
    pub failure: i64,
    pub total: i64,
}

impl From<AttemptSummary> for AttemptTally {
    fn from(s: AttemptSummary) -> Self {
        Self { success: s.success, failure: s.failure, total: s.total }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailingResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub message_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    pub status: MailingStatus,
    pub recipient_ids: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<AttemptTally>,
}

impl From<Mailing> for MailingResponse {
    fn from(m: Mailing) -> Self {
        Self {
            id: m.id,
            owner_id: m.owner_id,
            message_id: m.message_id,
            start: m.window.start(),
            end: m.window.end(),
            status: m.status,
            recipient_ids: m.recipient_ids,
            created_at: m.created_at,
            attempts: None,
        }
    }
}

impl From<MailingDetail> for MailingResponse {
    fn from(detail: MailingDetail) -> Self {
        Self { attempts: Some(detail.attempts.into()), ..Self::from(detail.mailing) }
    }
}

#[derive(Serialize)]
pub struct SendReportResponse {
    pub sent: u32,
    pub failed: u32,
}

impl From<SendReport> for SendReportResponse {
    fn from(r: SendReport) -> Self {
        Self { sent: r.sent, failed: r.failed }
    }
}
