use crate::adapters::database::DbPool;
use crate::adapters::database::user_repo::UserRepository;
use crate::domain::auth::AuthSession;
use crate::error::{AppError, Result};
use crate::services::auth_service::AuthService;
use opentelemetry::{global, metrics::Counter};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 150;

#[derive(Clone, Debug)]
struct Metrics {
    users_registered_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("mailing-server");
        Self {
            users_registered_total: meter
                .u64_counter("users_registered_total")
                .with_description("Total number of successful user registrations")
                .build(),
        }
    }
}

/// Self-service account flows: registration and sessions.
#[derive(Clone, Debug)]
pub struct AccountService {
    pool: DbPool,
    user_repo: UserRepository,
    auth_service: AuthService,
    metrics: Metrics,
}

impl AccountService {
    #[must_use]
    pub fn new(pool: DbPool, user_repo: UserRepository, auth_service: AuthService) -> Self {
        Self { pool, user_repo, auth_service, metrics: Metrics::new() }
    }

    /// Creates an account and signs it in.
    ///
    /// # Errors
    /// Returns `AppError::Validation` for malformed input, `AppError::Conflict` if the username or email is taken.
    #[tracing::instrument(skip(self, username, email, password), fields(user_id = tracing::field::Empty), err(level = "warn"))]
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<AuthSession> {
        validate_registration(username, email, password)?;
        let password_hash = self.auth_service.hash_password(password).await?;

        let mut tx = self.pool.begin().await?;
        let user = self.user_repo.create(&mut tx, username.trim(), email.trim(), &password_hash).await?;
        tracing::Span::current().record("user_id", tracing::field::display(user.id));

        let session = self.auth_service.create_session(&mut tx, user.id).await?;
        tx.commit().await?;

        tracing::info!("User registered successfully");
        self.metrics.users_registered_total.add(1, &[]);
        Ok(session)
    }

    /// # Errors
    /// Returns `AppError::AuthError` if the credentials are rejected.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession> {
        self.auth_service.login(username, password).await
    }

    /// # Errors
    /// Returns `AppError::AuthError` if the refresh token is rejected.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        self.auth_service.refresh_session(refresh_token).await
    }

    /// # Errors
    /// Returns `AppError::Database` if the token cannot be revoked.
    pub async fn logout(&self, user_id: Uuid, refresh_token: &str) -> Result<()> {
        self.auth_service.logout(user_id, refresh_token).await
    }
}

pub(crate) fn validate_registration(username: &str, email: &str, password: &str) -> Result<()> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!("Username must be 1 to {MAX_USERNAME_LEN} characters")));
    }
    validate_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!("Password must be at least {MIN_PASSWORD_LEN} characters")));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if well_formed && !email.chars().any(char::is_whitespace) {
        Ok(())
    } else {
        Err(AppError::Validation("Invalid email address".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_validation() {
        assert!(validate_registration("ann", "ann@example.com", "password123").is_ok());
        assert!(matches!(validate_registration(" ", "ann@example.com", "password123"), Err(AppError::Validation(_))));
        assert!(matches!(validate_registration("ann", "ann", "password123"), Err(AppError::Validation(_))));
        assert!(matches!(validate_registration("ann", "ann@example.com", "short"), Err(AppError::Validation(_))));
    }
}
