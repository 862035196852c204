use crate::adapters::database::DbPool;
use crate::adapters::database::delivery_repo::DeliveryRepository;
use crate::adapters::database::mailing_repo::MailingRepository;
use crate::adapters::database::message_repo::MessageRepository;
use crate::adapters::database::recipient_repo::RecipientRepository;
use crate::domain::access::AccessPolicy;
use crate::domain::delivery::AttemptSummary;
use crate::domain::mailing::{Mailing, MailingStatus, SendReport, Window};
use crate::domain::page::Page;
use crate::domain::user::{Actor, Permission};
use crate::error::{AppError, Result};
use crate::services::lifecycle_service::LifecycleService;
use crate::services::message_service::MESSAGE_POLICY;
use crate::services::recipient_service::RECIPIENT_POLICY;
use opentelemetry::{KeyValue, global, metrics::Counter};
use sqlx::PgConnection;
use std::collections::BTreeSet;
use time::OffsetDateTime;
use uuid::Uuid;

pub(crate) const MAILING_POLICY: AccessPolicy = AccessPolicy::owner_or_permission(&[Permission::CanViewAllMailings]);
const DISABLE_POLICY: AccessPolicy = AccessPolicy::global_permission(&[Permission::CanDisableMailing]);
const CREATE_POLICY: AccessPolicy = AccessPolicy::authenticated();

#[derive(Clone, Debug)]
struct Metrics {
    dispatch_runs_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("mailing-server");
        Self {
            dispatch_runs_total: meter
                .u64_counter("mailing_dispatch_runs_total")
                .with_description("Mailings sent, by trigger and result")
                .build(),
        }
    }
}

/// Values submitted when creating or updating a mailing.
#[derive(Debug, Clone)]
pub struct MailingDraft {
    pub message_id: Uuid,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub recipient_ids: Vec<Uuid>,
}

/// A mailing together with the tally of its delivery attempts.
#[derive(Debug, Clone)]
pub struct MailingDetail {
    pub mailing: Mailing,
    pub attempts: AttemptSummary,
}

/// Totals of one pass over all open mailings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub mailings: u32,
    pub errors: u32,
    pub sent: u32,
    pub failed: u32,
}

#[derive(Clone, Debug)]
pub struct MailingService {
    pool: DbPool,
    mailing_repo: MailingRepository,
    message_repo: MessageRepository,
    recipient_repo: RecipientRepository,
    delivery_repo: DeliveryRepository,
    lifecycle: LifecycleService,
    from_address: String,
    metrics: Metrics,
}

impl MailingService {
    #[must_use]
    pub fn new(
        pool: DbPool,
        mailing_repo: MailingRepository,
        message_repo: MessageRepository,
        recipient_repo: RecipientRepository,
        delivery_repo: DeliveryRepository,
        lifecycle: LifecycleService,
        from_address: String,
    ) -> Self {
        Self {
            pool,
            mailing_repo,
            message_repo,
            recipient_repo,
            delivery_repo,
            lifecycle,
            from_address,
            metrics: Metrics::new(),
        }
    }

    /// Creates a mailing owned by the actor.
    ///
    /// # Errors
    /// Returns `AppError::Validation` for an invalid window or unknown references,
    /// `AppError::Forbidden` if a referenced message or recipient cannot be attached by the actor.
    #[tracing::instrument(skip(self, actor, draft), fields(mailing_id = tracing::field::Empty), err(level = "warn"))]
    pub async fn create(&self, actor: &Actor, draft: MailingDraft) -> Result<Mailing> {
        CREATE_POLICY.authorize_global(actor)?;
        let owner_id = actor.user_id().ok_or(AppError::AuthError)?;

        let now = OffsetDateTime::now_utc();
        let window = Window::new(draft.start, draft.end, now).map_err(|e| AppError::Validation(e.to_string()))?;

        let mut tx = self.pool.begin().await?;
        let recipient_ids = self.check_references(&mut tx, actor, draft.message_id, &draft.recipient_ids).await?;

        let status = MailingStatus::from(window.phase_at(now));
        let id = self.mailing_repo.create(&mut tx, owner_id, draft.message_id, window, status).await?;
        self.mailing_repo.set_recipients(&mut tx, id, &recipient_ids).await?;
        let mailing = self.mailing_repo.find_by_id(&mut tx, id).await?.ok_or(AppError::Internal)?;

        tx.commit().await?;

        tracing::Span::current().record("mailing_id", tracing::field::display(id));
        tracing::info!("Mailing created");
        Ok(mailing)
    }

    /// Reads one mailing with its attempt summary, reconciling its status first.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::Forbidden`.
    #[tracing::instrument(skip(self, actor), err(level = "debug"))]
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<MailingDetail> {
        let mut conn = self.pool.acquire().await?;
        let mut mailing = self.load_authorized(&mut conn, actor, id).await?;

        self.lifecycle.refresh_status(&mut conn, &mut mailing, OffsetDateTime::now_utc()).await?;
        let attempts = self.delivery_repo.summarize(&mut conn, Some(id)).await?;

        Ok(MailingDetail { mailing, attempts })
    }

    /// Lists the mailings visible to the actor, each reconciled.
    ///
    /// The page is selected by the stored status and re-ordered after reconciliation,
    /// so a mailing whose status just changed may sit on a neighbouring page.
    ///
    /// # Errors
    /// Returns `AppError::Forbidden` for anonymous actors.
    #[tracing::instrument(skip(self, actor), err(level = "debug"))]
    pub async fn list(&self, actor: &Actor, page: Page) -> Result<Vec<Mailing>> {
        let scope = MAILING_POLICY.list_scope(actor)?;

        let mut conn = self.pool.acquire().await?;
        let mut mailings = self.mailing_repo.list(&mut conn, scope.owner_filter(), page).await?;

        let now = OffsetDateTime::now_utc();
        for mailing in &mut mailings {
            self.lifecycle.refresh_status(&mut conn, mailing, now).await?;
        }
        sort_for_listing(&mut mailings);

        Ok(mailings)
    }

    /// Replaces window, message and recipients of a mailing.
    ///
    /// # Errors
    /// Returns `AppError::NotFound`, `AppError::Forbidden` or `AppError::Validation`.
    #[tracing::instrument(skip(self, actor, draft), err(level = "warn"))]
    pub async fn update(&self, actor: &Actor, id: Uuid, draft: MailingDraft) -> Result<Mailing> {
        let mut tx = self.pool.begin().await?;
        self.load_authorized(&mut tx, actor, id).await?;

        let now = OffsetDateTime::now_utc();
        let window = Window::new(draft.start, draft.end, now).map_err(|e| AppError::Validation(e.to_string()))?;
        let recipient_ids = self.check_references(&mut tx, actor, draft.message_id, &draft.recipient_ids).await?;

        if !self.mailing_repo.update(&mut tx, id, draft.message_id, window).await? {
            return Err(AppError::NotFound);
        }
        self.mailing_repo.set_recipients(&mut tx, id, &recipient_ids).await?;

        let mut mailing = self.mailing_repo.find_by_id(&mut tx, id).await?.ok_or(AppError::NotFound)?;
        self.lifecycle.refresh_status(&mut tx, &mut mailing, now).await?;

        tx.commit().await?;
        Ok(mailing)
    }

    /// Deletes a mailing and its attempts.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::Forbidden`.
    #[tracing::instrument(skip(self, actor), err(level = "warn"))]
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        self.load_authorized(&mut conn, actor, id).await?;

        if !self.mailing_repo.delete(&mut conn, id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!("Mailing deleted");
        Ok(())
    }

    /// Sends a mailing on demand.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the mailing is disabled or outside its window.
    #[tracing::instrument(skip(self, actor), err(level = "warn"))]
    pub async fn send(&self, actor: &Actor, id: Uuid) -> Result<SendReport> {
        let mut mailing = {
            let mut conn = self.pool.acquire().await?;
            let mut mailing = self.load_authorized(&mut conn, actor, id).await?;
            self.lifecycle.refresh_status(&mut conn, &mut mailing, OffsetDateTime::now_utc()).await?;
            mailing
        };

        if mailing.status.is_disabled() {
            return Err(AppError::Conflict("Mailing has been disabled".into()));
        }
        if !LifecycleService::can_send_now(&mailing, OffsetDateTime::now_utc()) {
            return Err(AppError::Conflict("Mailing is outside its sending window".into()));
        }

        let report = self.lifecycle.send_mailing(&mut mailing, &self.from_address).await?;
        self.metrics.dispatch_runs_total.add(1, &[KeyValue::new("trigger", "manual"), KeyValue::new("result", "ok")]);
        Ok(report)
    }

    /// Permanently disables a mailing.
    ///
    /// # Errors
    /// Returns `AppError::Forbidden` unless the actor may disable mailings.
    #[tracing::instrument(skip(self, actor), err(level = "warn"))]
    pub async fn disable(&self, actor: &Actor, id: Uuid) -> Result<Mailing> {
        DISABLE_POLICY.authorize_global(actor)?;

        let mut conn = self.pool.acquire().await?;
        let mut mailing = self.mailing_repo.find_by_id(&mut conn, id).await?.ok_or(AppError::NotFound)?;
        self.lifecycle.disable(&mut conn, &mut mailing).await?;

        tracing::info!("Mailing disabled");
        Ok(mailing)
    }

    /// Sends every mailing whose window is open at `now`. A failing mailing does not stop the others.
    ///
    /// # Errors
    /// Returns `AppError::Database` only if the open mailings cannot be loaded.
    #[tracing::instrument(skip(self), err)]
    pub async fn dispatch_open(&self, now: OffsetDateTime) -> Result<DispatchSummary> {
        let mailings = {
            let mut conn = self.pool.acquire().await?;
            self.mailing_repo.find_open(&mut conn, now).await?
        };

        let mut summary = DispatchSummary::default();
        for mut mailing in mailings {
            summary.mailings += 1;
            match self.lifecycle.send_mailing(&mut mailing, &self.from_address).await {
                Ok(report) => {
                    summary.sent += report.sent;
                    summary.failed += report.failed;
                    self.metrics
                        .dispatch_runs_total
                        .add(1, &[KeyValue::new("trigger", "scheduled"), KeyValue::new("result", "ok")]);
                }
                Err(e) => {
                    summary.errors += 1;
                    tracing::error!(mailing_id = %mailing.id, error = %e, "Failed to send mailing");
                    self.metrics
                        .dispatch_runs_total
                        .add(1, &[KeyValue::new("trigger", "scheduled"), KeyValue::new("result", "error")]);
                }
            }
        }

        Ok(summary)
    }

    async fn load_authorized(&self, conn: &mut PgConnection, actor: &Actor, id: Uuid) -> Result<Mailing> {
        if !actor.is_authenticated() {
            return Err(AppError::AuthError);
        }
        let mailing = self.mailing_repo.find_by_id(conn, id).await?.ok_or(AppError::NotFound)?;
        MAILING_POLICY.authorize(actor, &mailing)?;
        Ok(mailing)
    }

    /// Verifies that the message and recipients exist and may be attached by the actor.
    /// Returns the de-duplicated recipient IDs.
    async fn check_references(
        &self,
        conn: &mut PgConnection,
        actor: &Actor,
        message_id: Uuid,
        recipient_ids: &[Uuid],
    ) -> Result<Vec<Uuid>> {
        let message = self
            .message_repo
            .find_by_id(conn, message_id)
            .await?
            .ok_or_else(|| AppError::Validation("Unknown message".into()))?;
        MESSAGE_POLICY.authorize(actor, &message)?;

        let unique: Vec<Uuid> = recipient_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let recipients = self.recipient_repo.find_many(conn, &unique).await?;
        if recipients.len() != unique.len() {
            return Err(AppError::Validation("Unknown recipient".into()));
        }
        for recipient in &recipients {
            RECIPIENT_POLICY.authorize(actor, recipient)?;
        }

        Ok(unique)
    }
}

/// Listing order: status, then window start, then id.
fn sort_for_listing(mailings: &mut [Mailing]) {
    mailings.sort_by(|a, b| {
        a.status
            .as_str()
            .cmp(b.status.as_str())
            .then_with(|| a.window.start().cmp(&b.window.start()))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mailing::WindowPhase;
    use time::Duration;

    fn mailing(status: MailingStatus, start_offset_hours: i64) -> Mailing {
        let start = OffsetDateTime::UNIX_EPOCH + Duration::hours(start_offset_hours);
        Mailing {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            window: Window::from_stored(start, start + Duration::hours(1)),
            status,
            recipient_ids: Vec::new(),
            created_at: None,
        }
    }

    #[test]
    fn test_listing_order_follows_reconciled_status() {
        let running = mailing(MailingStatus::Scheduled(WindowPhase::Running), 1);
        let created_late = mailing(MailingStatus::Scheduled(WindowPhase::Created), 5);
        let created_early = mailing(MailingStatus::Scheduled(WindowPhase::Created), 2);
        let finished = mailing(MailingStatus::Scheduled(WindowPhase::Finished), 0);

        // As fetched by stored status, then reconciled in place: the first row became running
        let mut page = vec![running.clone(), created_late.clone(), finished.clone(), created_early.clone()];
        sort_for_listing(&mut page);

        let ids: Vec<Uuid> = page.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![created_early.id, created_late.id, finished.id, running.id]);
    }
}
