use crate::adapters::database::DbPool;
use crate::adapters::database::message_repo::MessageRepository;
use crate::domain::access::AccessPolicy;
use crate::domain::message::Message;
use crate::domain::page::Page;
use crate::domain::user::{Actor, Permission};
use crate::error::{AppError, Result};
use sqlx::PgConnection;
use uuid::Uuid;

pub(crate) const MESSAGE_POLICY: AccessPolicy = AccessPolicy::owner_or_permission(&[Permission::CanManageMessages]);
const CREATE_POLICY: AccessPolicy = AccessPolicy::authenticated();

const MAX_SUBJECT_LEN: usize = 100;

#[derive(Clone, Debug)]
pub struct MessageService {
    pool: DbPool,
    repo: MessageRepository,
}

impl MessageService {
    #[must_use]
    pub const fn new(pool: DbPool, repo: MessageRepository) -> Self {
        Self { pool, repo }
    }

    /// Creates a message owned by the actor.
    ///
    /// # Errors
    /// Returns `AppError::Validation` if the subject is empty or too long.
    #[tracing::instrument(skip(self, actor, body), err(level = "warn"))]
    pub async fn create(&self, actor: &Actor, subject: &str, body: &str) -> Result<Message> {
        CREATE_POLICY.authorize_global(actor)?;
        let owner_id = actor.user_id().ok_or(AppError::AuthError)?;
        validate_subject(subject)?;

        let mut conn = self.pool.acquire().await?;
        self.repo.create(&mut conn, owner_id, subject, body).await
    }

    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::Forbidden`.
    #[tracing::instrument(skip(self, actor), err(level = "debug"))]
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Message> {
        let mut conn = self.pool.acquire().await?;
        self.load_authorized(&mut conn, actor, id).await
    }

    /// Lists messages visible to the actor, ordered by subject.
    ///
    /// # Errors
    /// Returns `AppError::Forbidden` for anonymous actors.
    #[tracing::instrument(skip(self, actor), err(level = "debug"))]
    pub async fn list(&self, actor: &Actor, page: Page) -> Result<Vec<Message>> {
        let scope = MESSAGE_POLICY.list_scope(actor)?;
        let mut conn = self.pool.acquire().await?;
        self.repo.list(&mut conn, scope.owner_filter(), page).await
    }

    /// # Errors
    /// Returns `AppError::NotFound`, `AppError::Forbidden` or `AppError::Validation`.
    #[tracing::instrument(skip(self, actor, body), err(level = "warn"))]
    pub async fn update(&self, actor: &Actor, id: Uuid, subject: &str, body: &str) -> Result<Message> {
        validate_subject(subject)?;
        let mut conn = self.pool.acquire().await?;
        self.load_authorized(&mut conn, actor, id).await?;
        self.repo.update(&mut conn, id, subject, body).await?.ok_or(AppError::NotFound)
    }

    /// Deletes a message together with the mailings that use it.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::Forbidden`.
    #[tracing::instrument(skip(self, actor), err(level = "warn"))]
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        self.load_authorized(&mut conn, actor, id).await?;
        if self.repo.delete(&mut conn, id).await? { Ok(()) } else { Err(AppError::NotFound) }
    }

    async fn load_authorized(&self, conn: &mut PgConnection, actor: &Actor, id: Uuid) -> Result<Message> {
        if !actor.is_authenticated() {
            return Err(AppError::AuthError);
        }
        let message = self.repo.find_by_id(conn, id).await?.ok_or(AppError::NotFound)?;
        MESSAGE_POLICY.authorize(actor, &message)?;
        Ok(message)
    }
}

fn validate_subject(subject: &str) -> Result<()> {
    let subject = subject.trim();
    if subject.is_empty() {
        return Err(AppError::Validation("Subject must not be empty".into()));
    }
    if subject.chars().count() > MAX_SUBJECT_LEN {
        return Err(AppError::Validation(format!("Subject must be at most {MAX_SUBJECT_LEN} characters")));
    }
    Ok(())
}
