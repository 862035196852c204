use crate::adapters::database::DbPool;
use crate::adapters::database::delivery_repo::{DeliveryRepository, NewAttempt};
use crate::adapters::database::mailing_repo::MailingRepository;
use crate::adapters::database::message_repo::MessageRepository;
use crate::adapters::database::recipient_repo::RecipientRepository;
use crate::adapters::mail::{Envelope, MailTransport};
use crate::domain::delivery::{DeliveryOutcome, SUCCESS_RESPONSE};
use crate::domain::mailing::{Mailing, MailingStatus, SendReport, Window, WindowPhase};
use crate::error::{AppError, Result};
use opentelemetry::{KeyValue, global, metrics::Counter};
use sqlx::PgConnection;
use std::sync::Arc;
use time::OffsetDateTime;

#[derive(Clone, Debug)]
struct Metrics {
    deliveries_total: Counter<u64>,
    status_changes_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("mailing-server");
        Self {
            deliveries_total: meter
                .u64_counter("mailing_deliveries_total")
                .with_description("Delivery attempts by outcome")
                .build(),
            status_changes_total: meter
                .u64_counter("mailing_status_changes_total")
                .with_description("Persisted mailing status transitions")
                .build(),
        }
    }
}

/// Status derivation, reconciliation and sending of mailings.
#[derive(Clone, Debug)]
pub struct LifecycleService {
    pool: DbPool,
    mailing_repo: MailingRepository,
    message_repo: MessageRepository,
    recipient_repo: RecipientRepository,
    delivery_repo: DeliveryRepository,
    transport: Arc<dyn MailTransport>,
    metrics: Metrics,
}

impl LifecycleService {
    #[must_use]
    pub fn new(
        pool: DbPool,
        mailing_repo: MailingRepository,
        message_repo: MessageRepository,
        recipient_repo: RecipientRepository,
        delivery_repo: DeliveryRepository,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            pool,
            mailing_repo,
            message_repo,
            recipient_repo,
            delivery_repo,
            transport,
            metrics: Metrics::new(),
        }
    }

    /// Phase of `window` at `now`. Both boundaries belong to the running phase.
    #[must_use]
    pub fn derive_status(window: &Window, now: OffsetDateTime) -> WindowPhase {
        window.phase_at(now)
    }

    /// Whether `now` lies inside the mailing window, regardless of the stored status.
    #[must_use]
    pub fn can_send_now(mailing: &Mailing, now: OffsetDateTime) -> bool {
        mailing.window.contains(now)
    }

    /// Brings the stored status in line with the window. Disabled mailings are left alone.
    /// Writes only the status column and only when it changes.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the status write fails.
    #[tracing::instrument(level = "debug", skip(self, conn, mailing), fields(mailing_id = %mailing.id), err)]
    pub async fn refresh_status(
        &self,
        conn: &mut PgConnection,
        mailing: &mut Mailing,
        now: OffsetDateTime,
    ) -> Result<MailingStatus> {
        let Some(next) = mailing.pending_status(now) else {
            return Ok(mailing.status);
        };

        self.mailing_repo.update_status(conn, mailing.id, next).await?;
        tracing::debug!(from = %mailing.status, to = %next, "Mailing status updated");
        self.metrics.status_changes_total.add(1, &[KeyValue::new("status", next.as_str())]);

        mailing.status = next;
        Ok(next)
    }

    /// Forces the disabled status, bypassing derivation.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the status write fails.
    #[tracing::instrument(level = "debug", skip(self, conn, mailing), fields(mailing_id = %mailing.id), err)]
    pub async fn disable(&self, conn: &mut PgConnection, mailing: &mut Mailing) -> Result<()> {
        self.mailing_repo.update_status(conn, mailing.id, MailingStatus::DisabledByAdmin).await?;
        mailing.status = MailingStatus::DisabledByAdmin;
        self.metrics.status_changes_total.add(1, &[KeyValue::new("status", MailingStatus::DisabledByAdmin.as_str())]);
        Ok(())
    }

    /// Sends the mailing's message to every recipient currently attached to it.
    ///
    /// Each recipient is attempted independently and leaves exactly one delivery attempt.
    /// Transport failures are recorded, not returned. The status is reconciled afterwards.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message no longer exists, or
    /// `AppError::Database` if reading recipients or recording an attempt fails.
    #[tracing::instrument(
        skip(self, mailing, from_address),
        fields(mailing_id = %mailing.id, sent = tracing::field::Empty, failed = tracing::field::Empty),
        err
    )]
    pub async fn send_mailing(&self, mailing: &mut Mailing, from_address: &str) -> Result<SendReport> {
        let mut conn = self.pool.acquire().await?;

        let message = self.message_repo.find_by_id(&mut conn, mailing.message_id).await?.ok_or(AppError::NotFound)?;
        let recipients = self.recipient_repo.find_for_mailing(&mut conn, mailing.id).await?;

        let mut report = SendReport::default();

        for recipient in &recipients {
            let envelope =
                Envelope { from: from_address, to: &recipient.email, subject: &message.subject, body: &message.body };

            let (outcome, response) = match self.transport.send(envelope).await {
                Ok(()) => {
                    report.sent += 1;
                    (DeliveryOutcome::Success, SUCCESS_RESPONSE.to_string())
                }
                Err(e) => {
                    tracing::warn!(recipient_id = %recipient.id, error = %e, "Delivery failed");
                    report.failed += 1;
                    (DeliveryOutcome::Failure, e.to_string())
                }
            };

            self.delivery_repo
                .record(
                    &mut conn,
                    NewAttempt {
                        mailing_id: mailing.id,
                        recipient_id: recipient.id,
                        recipient_email: &recipient.email,
                        outcome,
                        response: &response,
                        attempted_at: OffsetDateTime::now_utc(),
                    },
                )
                .await?;

            self.metrics.deliveries_total.add(1, &[KeyValue::new("outcome", outcome.as_str())]);
        }

        self.refresh_status(&mut conn, mailing, OffsetDateTime::now_utc()).await?;

        let span = tracing::Span::current();
        span.record("sent", report.sent);
        span.record("failed", report.failed);
        tracing::info!("Mailing sent");

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use uuid::Uuid;

    fn mailing(start: OffsetDateTime, end: OffsetDateTime, status: MailingStatus) -> Mailing {
        Mailing {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            window: Window::from_stored(start, end),
            status,
            recipient_ids: Vec::new(),
            created_at: None,
        }
    }

    #[test]
    fn test_derive_status_each_phase() {
        let now = OffsetDateTime::now_utc();
        let window = Window::from_stored(now, now + Duration::hours(1));

        assert_eq!(LifecycleService::derive_status(&window, now - Duration::seconds(1)), WindowPhase::Created);
        assert_eq!(LifecycleService::derive_status(&window, now), WindowPhase::Running);
        assert_eq!(LifecycleService::derive_status(&window, now + Duration::hours(2)), WindowPhase::Finished);
    }

    #[test]
    fn test_can_send_now_ignores_stored_status() {
        let now = OffsetDateTime::now_utc();
        let open = mailing(now - Duration::hours(1), now + Duration::hours(1), MailingStatus::DisabledByAdmin);
        assert!(LifecycleService::can_send_now(&open, now));

        let future = mailing(now + Duration::hours(1), now + Duration::hours(2), WindowPhase::Running.into());
        assert!(!LifecycleService::can_send_now(&future, now));
    }
}
