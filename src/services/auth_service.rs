use crate::adapters::database::DbPool;
use crate::adapters::database::refresh_token_repo::RefreshTokenRepository;
use crate::adapters::database::user_repo::UserRepository;
use crate::config::AuthConfig;
use crate::domain::auth::{AuthSession, Claims};
use crate::domain::user::Actor;
use crate::error::{AppError, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use base64::Engine;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use opentelemetry::{KeyValue, global, metrics::Counter};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    login_total: Counter<u64>,
    refresh_total: Counter<u64>,
    logout_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("mailing-server");
        Self {
            login_total: meter.u64_counter("auth_login_total").with_description("Login attempts by result").build(),
            refresh_total: meter
                .u64_counter("auth_refresh_total")
                .with_description("Total number of successful token rotations")
                .build(),
            logout_total: meter
                .u64_counter("auth_logout_total")
                .with_description("Total number of successful logout attempts")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthService {
    config: AuthConfig,
    pool: DbPool,
    user_repo: UserRepository,
    refresh_repo: RefreshTokenRepository,
    metrics: Metrics,
}

impl AuthService {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        pool: DbPool,
        user_repo: UserRepository,
        refresh_repo: RefreshTokenRepository,
    ) -> Self {
        Self { config, pool, user_repo, refresh_repo, metrics: Metrics::new() }
    }

    /// Verifies credentials of an active user and opens a session.
    ///
    /// # Errors
    /// Returns `AppError::AuthError` for unknown users, wrong passwords and blocked accounts.
    #[tracing::instrument(skip(self, username, password), fields(user_id = tracing::field::Empty), err(level = "warn"))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession> {
        let mut conn = self.pool.acquire().await?;
        let Some(user) = self.user_repo.find_by_username(&mut conn, username).await? else {
            tracing::warn!("Login failed: user not found");
            self.metrics.login_total.add(1, &[KeyValue::new("result", "unknown_user")]);
            return Err(AppError::AuthError);
        };

        tracing::Span::current().record("user_id", tracing::field::display(user.id));

        if !self.verify_password(password, &user.password_hash).await? {
            tracing::warn!("Login failed: invalid password");
            self.metrics.login_total.add(1, &[KeyValue::new("result", "invalid_password")]);
            return Err(AppError::AuthError);
        }

        if !user.is_active {
            tracing::warn!("Login failed: account is blocked");
            self.metrics.login_total.add(1, &[KeyValue::new("result", "blocked")]);
            return Err(AppError::AuthError);
        }

        let session = self.create_session(&mut conn, user.id).await?;
        self.metrics.login_total.add(1, &[KeyValue::new("result", "ok")]);
        Ok(session)
    }

    /// Hashes a password with argon2 on a blocking thread.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if hashing fails.
    #[tracing::instrument(err, skip(self, password))]
    pub async fn hash_password(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map_err(|_| AppError::Internal)
                .map(|h| h.to_string())
        })
        .await
        .map_err(|_| AppError::Internal)?
    }

    /// # Errors
    /// Returns `AppError::Internal` if the stored hash cannot be parsed.
    #[tracing::instrument(err, skip(self, password, password_hash))]
    pub async fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        tokio::task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash).map_err(|_| AppError::Internal)?;
            Ok(Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_ok())
        })
        .await
        .map_err(|_| AppError::Internal)?
    }

    /// Issues an access token and stores a fresh refresh token.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the refresh token cannot be stored.
    #[tracing::instrument(err, skip(self, conn), fields(user_id = %user_id))]
    pub async fn create_session(&self, conn: &mut PgConnection, user_id: Uuid) -> Result<AuthSession> {
        let claims = Claims::expiring_in(user_id, self.config.access_token_ttl_secs);
        let token = self.encode_jwt(&claims)?;

        let refresh_token = generate_opaque_token();
        let refresh_hash = hash_opaque_token(&refresh_token);
        self.refresh_repo.create(conn, user_id, &refresh_hash, self.config.refresh_token_ttl_days).await?;

        Ok(AuthSession { token, refresh_token, expires_at: i64::try_from(claims.exp).unwrap_or(i64::MAX) })
    }

    /// Exchanges a refresh token for a new token pair. The old refresh token is consumed.
    ///
    /// # Errors
    /// Returns `AppError::AuthError` if the token is unknown, expired or belongs to a blocked user.
    #[tracing::instrument(err(level = "warn"), skip(self, refresh_token), fields(user_id = tracing::field::Empty))]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession> {
        let mut conn = self.pool.acquire().await?;
        let old_hash = hash_opaque_token(refresh_token);
        let new_refresh_token = generate_opaque_token();
        let new_hash = hash_opaque_token(&new_refresh_token);

        let user_id = self
            .refresh_repo
            .rotate(&mut conn, &old_hash, &new_hash, self.config.refresh_token_ttl_days)
            .await?
            .ok_or(AppError::AuthError)?;

        tracing::Span::current().record("user_id", tracing::field::display(user_id));

        let claims = Claims::expiring_in(user_id, self.config.access_token_ttl_secs);
        let token = self.encode_jwt(&claims)?;

        tracing::info!("Tokens rotated successfully");
        self.metrics.refresh_total.add(1, &[]);

        Ok(AuthSession {
            token,
            refresh_token: new_refresh_token,
            expires_at: i64::try_from(claims.exp).unwrap_or(i64::MAX),
        })
    }

    /// # Errors
    /// Returns `AppError::Database` if the token cannot be revoked.
    #[tracing::instrument(err, skip(self, refresh_token), fields(user_id = %user_id))]
    pub async fn logout(&self, user_id: Uuid, refresh_token: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        self.refresh_repo.delete_owned(&mut conn, &hash_opaque_token(refresh_token), user_id).await?;
        self.metrics.logout_total.add(1, &[]);
        Ok(())
    }

    /// Verifies an access token and returns its subject.
    ///
    /// # Errors
    /// Returns `AppError::AuthError` if the token is malformed, forged or expired.
    pub fn verify_token(&self, token: &str) -> Result<Uuid> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::AuthError)?;

        Ok(token_data.claims.sub)
    }

    /// Resolves an access token into the acting principal with its current permissions.
    ///
    /// # Errors
    /// Returns `AppError::AuthError` if the token is invalid or the user is gone or blocked.
    #[tracing::instrument(level = "debug", skip(self, token), err(level = "debug"))]
    pub async fn authenticate(&self, token: &str) -> Result<Actor> {
        let user_id = self.verify_token(token)?;

        let mut conn = self.pool.acquire().await?;
        let user = self.user_repo.find_by_id(&mut conn, user_id).await?.ok_or(AppError::AuthError)?;
        if !user.is_active {
            return Err(AppError::AuthError);
        }
        let permissions = self.user_repo.find_permissions(&mut conn, user_id).await?;

        Ok(Actor::authenticated(user.id, user.is_staff, permissions))
    }

    fn encode_jwt(&self, claims: &Claims) -> Result<String> {
        encode(&Header::default(), claims, &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()))
            .map_err(|_| AppError::Internal)
    }
}

fn generate_opaque_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_opaque_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_service() -> AuthService {
        let config = AuthConfig {
            jwt_secret: "test_secret".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_days: 7,
        };
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/test").unwrap();
        AuthService::new(config, pool, UserRepository::new(), RefreshTokenRepository::new())
    }

    #[tokio::test]
    async fn test_jwt_roundtrip() {
        let service = setup_service();
        let user_id = Uuid::new_v4();
        let token = service.encode_jwt(&Claims::expiring_in(user_id, 600)).unwrap();

        assert_eq!(service.verify_token(&token).unwrap(), user_id);
    }

    #[tokio::test]
    async fn test_expired_or_foreign_tokens_rejected() {
        let service = setup_service();
        let expired = service.encode_jwt(&Claims { sub: Uuid::new_v4(), exp: 1_000 }).unwrap();
        assert!(matches!(service.verify_token(&expired), Err(AppError::AuthError)));

        let foreign = encode(
            &Header::default(),
            &Claims::expiring_in(Uuid::new_v4(), 600),
            &EncodingKey::from_secret(b"other_secret"),
        )
        .unwrap();
        assert!(matches!(service.verify_token(&foreign), Err(AppError::AuthError)));
    }

    #[tokio::test]
    async fn test_password_hashing() {
        let service = setup_service();
        let hash = service.hash_password("password12345").await.unwrap();

        assert!(service.verify_password("password12345", &hash).await.unwrap());
        assert!(!service.verify_password("wrong_password", &hash).await.unwrap());
    }

    #[test]
    fn test_opaque_token_logic() {
        let token1 = generate_opaque_token();
        let token2 = generate_opaque_token();
        assert_ne!(token1, token2);
        assert_eq!(hash_opaque_token(&token1), hash_opaque_token(&token1));
        assert_ne!(hash_opaque_token(&token1), hash_opaque_token(&token2));
    }
}
