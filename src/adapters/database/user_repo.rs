use crate::adapters::database::records::UserRecord;
use crate::domain::page::Page;
use crate::domain::user::{Permission, User};
use crate::error::{AppError, Result};
use sqlx::PgConnection;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, password_hash, is_staff, is_active, created_at";

#[derive(Clone, Debug, Default)]
pub struct UserRepository {}

impl UserRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Creates a new user.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the username or email is already taken.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, password_hash))]
    pub(crate) async fn create(
        &self,
        conn: &mut PgConnection,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let result = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(conn)
        .await;

        match result {
            Ok(record) => Ok(record.into()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23505") => {
                Err(AppError::Conflict("Username or email already exists".into()))
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// Creates a staff user, or resets the password and flags of an existing one.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the upsert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, password_hash), err)]
    pub(crate) async fn upsert_staff(
        &self,
        conn: &mut PgConnection,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, is_staff, is_active)
            VALUES ($1, $2, $3, TRUE, TRUE)
            ON CONFLICT (username) DO UPDATE
            SET password_hash = EXCLUDED.password_hash, is_staff = TRUE, is_active = TRUE
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(conn)
        .await?;

        Ok(record.into())
    }

    /// Finds a user by username.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn find_by_username(&self, conn: &mut PgConnection, username: &str) -> Result<Option<User>> {
        let record =
            sqlx::query_as::<_, UserRecord>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
                .bind(username)
                .fetch_optional(conn)
                .await?;

        Ok(record.map(Into::into))
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn find_by_id(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(record.map(Into::into))
    }

    /// Lists users ordered by username.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn list(&self, conn: &mut PgConnection, page: Page) -> Result<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Updates a user's email.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the email belongs to another user.
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn update_email(&self, conn: &mut PgConnection, id: Uuid, email: &str) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET email = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(email)
        .fetch_optional(conn)
        .await;

        match result {
            Ok(record) => Ok(record.map(Into::into)),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23505") => {
                Err(AppError::Conflict("Email already in use".into()))
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// Sets the active flag. Returns `false` if the user does not exist.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn set_active(&self, conn: &mut PgConnection, id: Uuid, is_active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Loads the named permissions held by a user. Unknown codenames are skipped.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn find_permissions(&self, conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<Permission>> {
        let codenames: Vec<String> =
            sqlx::query_scalar("SELECT permission FROM user_permissions WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(conn)
                .await?;

        Ok(codenames.iter().filter_map(|c| c.parse().ok()).collect())
    }

    /// Grants permissions to a user. Already held permissions are left untouched.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the user does not exist.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn grant_permissions(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        permissions: &[Permission],
    ) -> Result<()> {
        let codenames: Vec<&str> = permissions.iter().map(|p| p.codename()).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO user_permissions (user_id, permission)
            SELECT $1, unnest($2::text[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(&codenames)
        .execute(conn)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => Err(AppError::NotFound),
            Err(e) => Err(AppError::Database(e)),
        }
    }
}
