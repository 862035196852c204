use crate::adapters::database::DbPool;
use crate::adapters::database::delivery_repo::DeliveryRepository;
use crate::adapters::database::mailing_repo::MailingRepository;
use crate::domain::delivery::DeliveryAttempt;
use crate::domain::page::Page;
use crate::domain::user::Actor;
use crate::error::{AppError, Result};
use crate::services::mailing_service::MAILING_POLICY;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct DeliveryService {
    pool: DbPool,
    delivery_repo: DeliveryRepository,
    mailing_repo: MailingRepository,
}

impl DeliveryService {
    #[must_use]
    pub const fn new(pool: DbPool, delivery_repo: DeliveryRepository, mailing_repo: MailingRepository) -> Self {
        Self { pool, delivery_repo, mailing_repo }
    }

    /// Lists delivery attempts newest first: every attempt for holders of the
    /// view-all permission, otherwise only attempts of the actor's own mailings.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::Forbidden` when filtering by a mailing the actor cannot see.
    #[tracing::instrument(skip(self, actor), err(level = "debug"))]
    pub async fn list(&self, actor: &Actor, mailing_id: Option<Uuid>, page: Page) -> Result<Vec<DeliveryAttempt>> {
        let scope = MAILING_POLICY.list_scope(actor)?;
        let mut conn = self.pool.acquire().await?;

        if let Some(id) = mailing_id {
            let mailing = self.mailing_repo.find_by_id(&mut conn, id).await?.ok_or(AppError::NotFound)?;
            MAILING_POLICY.authorize(actor, &mailing)?;
        }

        self.delivery_repo.list(&mut conn, scope.owner_filter(), mailing_id, page).await
    }
}
