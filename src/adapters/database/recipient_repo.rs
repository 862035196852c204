use crate::adapters::database::records::RecipientRecord;
use crate::domain::page::Page;
use crate::domain::recipient::Recipient;
use crate::error::{AppError, Result};
use sqlx::PgConnection;
use uuid::Uuid;

const RECIPIENT_COLUMNS: &str = "id, owner_id, email, full_name, comment, created_at";

/// Field values of a recipient as submitted by a user.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecipientFields<'a> {
    pub email: &'a str,
    pub full_name: &'a str,
    pub comment: &'a str,
}

#[derive(Clone, Debug, Default)]
pub struct RecipientRepository {}

impl RecipientRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Creates a recipient owned by `owner_id`.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the email is already registered.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, fields))]
    pub(crate) async fn create(
        &self,
        conn: &mut PgConnection,
        owner_id: Uuid,
        fields: RecipientFields<'_>,
    ) -> Result<Recipient> {
        let result = sqlx::query_as::<_, RecipientRecord>(&format!(
            r#"
            INSERT INTO recipients (owner_id, email, full_name, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING {RECIPIENT_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(fields.email)
        .bind(fields.full_name)
        .bind(fields.comment)
        .fetch_one(conn)
        .await;

        map_unique_violation(result).map(Into::into)
    }

    /// Finds a recipient by ID.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn find_by_id(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<Recipient>> {
        let record = sqlx::query_as::<_, RecipientRecord>(&format!(
            "SELECT {RECIPIENT_COLUMNS} FROM recipients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Fetches all recipients with the given IDs. Missing IDs are silently absent from the result.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn, ids), fields(count = ids.len()), err)]
    pub(crate) async fn find_many(&self, conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<Recipient>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = sqlx::query_as::<_, RecipientRecord>(&format!(
            "SELECT {RECIPIENT_COLUMNS} FROM recipients WHERE id = ANY($1) ORDER BY email ASC"
        ))
        .bind(ids)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Fetches the recipients currently attached to a mailing.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn find_for_mailing(&self, conn: &mut PgConnection, mailing_id: Uuid) -> Result<Vec<Recipient>> {
        let records = sqlx::query_as::<_, RecipientRecord>(
            r#"
            SELECT r.id, r.owner_id, r.email, r.full_name, r.comment, r.created_at
            FROM recipients r
            JOIN mailing_recipients mr ON mr.recipient_id = r.id
            WHERE mr.mailing_id = $1
            ORDER BY r.email ASC
            "#,
        )
        .bind(mailing_id)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Lists recipients ordered by email, optionally restricted to one owner.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn list(&self, conn: &mut PgConnection, owner_id: Option<Uuid>, page: Page) -> Result<Vec<Recipient>> {
        let records = sqlx::query_as::<_, RecipientRecord>(&format!(
            r#"
            SELECT {RECIPIENT_COLUMNS}
            FROM recipients
            WHERE ($1::uuid IS NULL OR owner_id = $1)
            ORDER BY email ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(owner_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Replaces the editable fields of a recipient.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the new email is already registered.
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn, fields))]
    pub(crate) async fn update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        fields: RecipientFields<'_>,
    ) -> Result<Option<Recipient>> {
        let result = sqlx::query_as::<_, RecipientRecord>(&format!(
            r#"
            UPDATE recipients
            SET email = $2, full_name = $3, comment = $4
            WHERE id = $1
            RETURNING {RECIPIENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(fields.email)
        .bind(fields.full_name)
        .bind(fields.comment)
        .fetch_optional(conn)
        .await;

        map_unique_violation(result).map(|r| r.map(Into::into))
    }

    /// Deletes a recipient and its mailing associations.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn delete(&self, conn: &mut PgConnection, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipients WHERE id = $1").bind(id).execute(conn).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Counts all recipients.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn count(&self, conn: &mut PgConnection) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM recipients").fetch_one(conn).await?;
        Ok(count)
    }
}

fn map_unique_violation<T>(result: std::result::Result<T, sqlx::Error>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23505") => {
            Err(AppError::Conflict("A recipient with this email already exists".into()))
        }
        Err(e) => Err(AppError::Database(e)),
    }
}
