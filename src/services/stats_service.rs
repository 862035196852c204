use crate::adapters::database::DbPool;
use crate::adapters::database::delivery_repo::DeliveryRepository;
use crate::adapters::database::mailing_repo::MailingRepository;
use crate::adapters::database::recipient_repo::RecipientRepository;
use crate::domain::access::AccessPolicy;
use crate::domain::stats::Dashboard;
use crate::domain::user::Actor;
use crate::error::Result;
use time::OffsetDateTime;

const STATS_POLICY: AccessPolicy = AccessPolicy::authenticated();

#[derive(Clone, Debug)]
pub struct StatsService {
    pool: DbPool,
    mailing_repo: MailingRepository,
    recipient_repo: RecipientRepository,
    delivery_repo: DeliveryRepository,
}

impl StatsService {
    #[must_use]
    pub const fn new(
        pool: DbPool,
        mailing_repo: MailingRepository,
        recipient_repo: RecipientRepository,
        delivery_repo: DeliveryRepository,
    ) -> Self {
        Self { pool, mailing_repo, recipient_repo, delivery_repo }
    }

    /// Global dashboard counters.
    ///
    /// # Errors
    /// Returns `AppError::Database` if a count fails.
    #[tracing::instrument(skip(self, actor), err)]
    pub async fn dashboard(&self, actor: &Actor) -> Result<Dashboard> {
        STATS_POLICY.authorize_global(actor)?;

        let mut conn = self.pool.acquire().await?;
        let now = OffsetDateTime::now_utc();

        let total_mailings = self.mailing_repo.count(&mut conn).await?;
        let active_mailings = self.mailing_repo.count_active(&mut conn, now).await?;
        let unique_recipients = self.recipient_repo.count(&mut conn).await?;
        let attempts = self.delivery_repo.summarize(&mut conn, None).await?;

        Ok(Dashboard {
            total_mailings,
            active_mailings,
            unique_recipients,
            attempts_success: attempts.success,
            attempts_failed: attempts.failure,
            attempts_total: attempts.total,
        })
    }
}
