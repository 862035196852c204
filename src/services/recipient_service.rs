use crate::adapters::database::DbPool;
use crate::adapters::database::recipient_repo::{RecipientFields, RecipientRepository};
use crate::domain::access::AccessPolicy;
use crate::domain::page::Page;
use crate::domain::recipient::Recipient;
use crate::domain::user::{Actor, Permission};
use crate::error::{AppError, Result};
use crate::services::account_service::validate_email;
use sqlx::PgConnection;
use uuid::Uuid;

pub(crate) const RECIPIENT_POLICY: AccessPolicy =
    AccessPolicy::owner_or_permission(&[Permission::CanManageRecipients]);
const CREATE_POLICY: AccessPolicy = AccessPolicy::authenticated();

const MAX_EMAIL_LEN: usize = 254;
const MAX_NAME_LEN: usize = 100;

/// Recipient values as submitted by a client.
#[derive(Debug, Clone)]
pub struct RecipientDraft {
    pub email: String,
    pub full_name: String,
    pub comment: String,
}

impl RecipientDraft {
    fn validate(&self) -> Result<RecipientFields<'_>> {
        let email = self.email.trim();
        let full_name = self.full_name.trim();

        validate_email(email)?;
        if email.len() > MAX_EMAIL_LEN {
            return Err(AppError::Validation("Invalid email address".into()));
        }
        if full_name.is_empty() || full_name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::Validation(format!("Full name must be 1 to {MAX_NAME_LEN} characters")));
        }

        Ok(RecipientFields { email, full_name, comment: &self.comment })
    }
}

#[derive(Clone, Debug)]
pub struct RecipientService {
    pool: DbPool,
    repo: RecipientRepository,
}

impl RecipientService {
    #[must_use]
    pub const fn new(pool: DbPool, repo: RecipientRepository) -> Self {
        Self { pool, repo }
    }

    /// Creates a recipient owned by the actor.
    ///
    /// # Errors
    /// Returns `AppError::Validation` for malformed fields, `AppError::Conflict` for a duplicate email.
    #[tracing::instrument(skip(self, actor, draft), err(level = "warn"))]
    pub async fn create(&self, actor: &Actor, draft: RecipientDraft) -> Result<Recipient> {
        CREATE_POLICY.authorize_global(actor)?;
        let owner_id = actor.user_id().ok_or(AppError::AuthError)?;
        let fields = draft.validate()?;

        let mut conn = self.pool.acquire().await?;
        self.repo.create(&mut conn, owner_id, fields).await
    }

    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::Forbidden`.
    #[tracing::instrument(skip(self, actor), err(level = "debug"))]
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Recipient> {
        let mut conn = self.pool.acquire().await?;
        self.load_authorized(&mut conn, actor, id).await
    }

    /// Lists recipients visible to the actor, ordered by email.
    ///
    /// # Errors
    /// Returns `AppError::Forbidden` for anonymous actors.
    #[tracing::instrument(skip(self, actor), err(level = "debug"))]
    pub async fn list(&self, actor: &Actor, page: Page) -> Result<Vec<Recipient>> {
        let scope = RECIPIENT_POLICY.list_scope(actor)?;
        let mut conn = self.pool.acquire().await?;
        self.repo.list(&mut conn, scope.owner_filter(), page).await
    }

    /// # Errors
    /// Returns `AppError::NotFound`, `AppError::Forbidden`, `AppError::Validation` or `AppError::Conflict`.
    #[tracing::instrument(skip(self, actor, draft), err(level = "warn"))]
    pub async fn update(&self, actor: &Actor, id: Uuid, draft: RecipientDraft) -> Result<Recipient> {
        let fields = draft.validate()?;
        let mut conn = self.pool.acquire().await?;
        self.load_authorized(&mut conn, actor, id).await?;
        self.repo.update(&mut conn, id, fields).await?.ok_or(AppError::NotFound)
    }

    /// Deletes a recipient. Past delivery attempts keep the recorded address.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::Forbidden`.
    #[tracing::instrument(skip(self, actor), err(level = "warn"))]
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        self.load_authorized(&mut conn, actor, id).await?;
        if self.repo.delete(&mut conn, id).await? { Ok(()) } else { Err(AppError::NotFound) }
    }

    async fn load_authorized(&self, conn: &mut PgConnection, actor: &Actor, id: Uuid) -> Result<Recipient> {
        if !actor.is_authenticated() {
            return Err(AppError::AuthError);
        }
        let recipient = self.repo.find_by_id(conn, id).await?.ok_or(AppError::NotFound)?;
        RECIPIENT_POLICY.authorize(actor, &recipient)?;
        Ok(recipient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(email: &str, full_name: &str) -> RecipientDraft {
        RecipientDraft { email: email.into(), full_name: full_name.into(), comment: String::new() }
    }

    #[test]
    fn test_validate_accepts_and_trims() {
        let d = draft("  ann@example.com ", " Ann Lee ");
        let fields = d.validate().unwrap();
        assert_eq!(fields.email, "ann@example.com");
        assert_eq!(fields.full_name, "Ann Lee");
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        for email in ["", "ann", "@example.com", "ann@localhost", "ann@.com", "a nn@example.com"] {
            assert!(matches!(draft(email, "Ann").validate(), Err(AppError::Validation(_))), "{email}");
        }
    }

    #[test]
    fn test_validate_rejects_bad_name() {
        assert!(matches!(draft("ann@example.com", " ").validate(), Err(AppError::Validation(_))));
        assert!(matches!(draft("ann@example.com", &"n".repeat(101)).validate(), Err(AppError::Validation(_))));
    }
}
