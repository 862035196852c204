use crate::adapters::database::DbPool;
use crate::adapters::database::refresh_token_repo::RefreshTokenRepository;
use crate::adapters::database::user_repo::UserRepository;
use crate::domain::access::AccessPolicy;
use crate::domain::page::Page;
use crate::domain::user::{Actor, Permission, Role, User};
use crate::error::{AppError, Result};
use crate::services::account_service::{validate_email, validate_registration};
use crate::services::auth_service::AuthService;
use uuid::Uuid;

const LIST_POLICY: AccessPolicy = AccessPolicy::global_permission(&[Permission::CanViewUsers]);
const BLOCK_POLICY: AccessPolicy = AccessPolicy::global_permission(&[Permission::CanBlockUsers]);
const PROFILE_READ_POLICY: AccessPolicy = AccessPolicy::owner_or_staff_read();
const PROFILE_EDIT_POLICY: AccessPolicy = AccessPolicy::owner_only_edit();

/// A user with the permissions currently granted to it.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: User,
    pub permissions: Vec<Permission>,
}

/// User administration.
#[derive(Clone, Debug)]
pub struct UserService {
    pool: DbPool,
    user_repo: UserRepository,
    refresh_repo: RefreshTokenRepository,
    auth_service: AuthService,
}

impl UserService {
    #[must_use]
    pub const fn new(
        pool: DbPool,
        user_repo: UserRepository,
        refresh_repo: RefreshTokenRepository,
        auth_service: AuthService,
    ) -> Self {
        Self { pool, user_repo, refresh_repo, auth_service }
    }

    /// # Errors
    /// Returns `AppError::Forbidden` unless the actor may view users.
    #[tracing::instrument(skip(self, actor), err(level = "debug"))]
    pub async fn list(&self, actor: &Actor, page: Page) -> Result<Vec<User>> {
        LIST_POLICY.authorize_global(actor)?;
        let mut conn = self.pool.acquire().await?;
        self.user_repo.list(&mut conn, page).await
    }

    /// Reads a profile. Staff may read any profile.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` or `AppError::Forbidden`.
    #[tracing::instrument(skip(self, actor), err(level = "debug"))]
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<UserProfile> {
        if !actor.is_authenticated() {
            return Err(AppError::AuthError);
        }
        let mut conn = self.pool.acquire().await?;
        let user = self.user_repo.find_by_id(&mut conn, id).await?.ok_or(AppError::NotFound)?;
        PROFILE_READ_POLICY.authorize(actor, &user)?;

        let permissions = self.user_repo.find_permissions(&mut conn, id).await?;
        Ok(UserProfile { user, permissions })
    }

    /// Changes the email of the actor's own profile.
    ///
    /// # Errors
    /// Returns `AppError::Forbidden` for anyone but the owner, `AppError::Conflict` if the email is taken.
    #[tracing::instrument(skip(self, actor, email), err(level = "warn"))]
    pub async fn update_email(&self, actor: &Actor, id: Uuid, email: &str) -> Result<User> {
        if !actor.is_authenticated() {
            return Err(AppError::AuthError);
        }
        validate_email(email)?;

        let mut conn = self.pool.acquire().await?;
        let user = self.user_repo.find_by_id(&mut conn, id).await?.ok_or(AppError::NotFound)?;
        PROFILE_EDIT_POLICY.authorize(actor, &user)?;

        self.user_repo.update_email(&mut conn, id, email.trim()).await?.ok_or(AppError::NotFound)
    }

    /// Blocks or unblocks an account. Blocking also revokes every refresh token of the user.
    ///
    /// # Errors
    /// Returns `AppError::Forbidden` unless the actor may block users,
    /// `AppError::BadRequest` when an actor tries to block itself.
    #[tracing::instrument(skip(self, actor), err(level = "warn"))]
    pub async fn set_active(&self, actor: &Actor, id: Uuid, is_active: bool) -> Result<()> {
        BLOCK_POLICY.authorize_global(actor)?;
        if !is_active && actor.is(id) {
            return Err(AppError::BadRequest("You cannot block yourself".into()));
        }

        let mut tx = self.pool.begin().await?;
        if !self.user_repo.set_active(&mut tx, id, is_active).await? {
            return Err(AppError::NotFound);
        }
        if !is_active {
            let revoked = self.refresh_repo.delete_all_for_user(&mut tx, id).await?;
            tracing::debug!(revoked, "Revoked refresh tokens of blocked user");
        }
        tx.commit().await?;

        tracing::info!(is_active, "User activity changed");
        Ok(())
    }

    /// Creates a staff account holding every permission, or resets an existing one.
    ///
    /// # Errors
    /// Returns `AppError::Validation` for malformed input.
    #[tracing::instrument(skip(self, email, password), err)]
    pub async fn create_admin(&self, username: &str, email: &str, password: &str) -> Result<User> {
        validate_registration(username, email, password)?;
        let password_hash = self.auth_service.hash_password(password).await?;

        let mut tx = self.pool.begin().await?;
        let user = self.user_repo.upsert_staff(&mut tx, username.trim(), email.trim(), &password_hash).await?;
        self.user_repo.grant_permissions(&mut tx, user.id, &Permission::ALL).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, "Admin account ready");
        Ok(user)
    }

    /// Grants every permission of a role to an existing user.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the user does not exist.
    #[tracing::instrument(skip(self), err)]
    pub async fn grant_role(&self, username: &str, role: Role) -> Result<User> {
        let mut conn = self.pool.acquire().await?;
        let user = self.user_repo.find_by_username(&mut conn, username).await?.ok_or(AppError::NotFound)?;
        self.user_repo.grant_permissions(&mut conn, user.id, role.permissions()).await?;

        tracing::info!(user_id = %user.id, ?role, "Role granted");
        Ok(user)
    }
}
