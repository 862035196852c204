use crate::adapters::database::records::MailingRecord;
use crate::domain::mailing::{Mailing, MailingStatus, Window};
use crate::domain::page::Page;
use crate::error::{AppError, Result};
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

const MAILING_COLUMNS: &str = r"
    m.id, m.owner_id, m.message_id, m.start_at, m.end_at, m.status, m.created_at,
    ARRAY(SELECT mr.recipient_id FROM mailing_recipients mr WHERE mr.mailing_id = m.id) AS recipient_ids
";

#[derive(Clone, Debug, Default)]
pub struct MailingRepository {}

impl MailingRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Inserts a mailing without recipients.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn create(
        &self,
        conn: &mut PgConnection,
        owner_id: Uuid,
        message_id: Uuid,
        window: Window,
        status: MailingStatus,
    ) -> Result<Uuid> {
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO mailings (owner_id, message_id, start_at, end_at, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(message_id)
        .bind(window.start())
        .bind(window.end())
        .bind(status.as_str())
        .fetch_one(conn)
        .await;

        match result {
            Ok(id) => Ok(id),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => Err(AppError::NotFound),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// Replaces the recipient set of a mailing.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if a recipient does not exist.
    /// Returns `AppError::Database` if the statements fail.
    #[tracing::instrument(level = "debug", skip(self, conn, recipient_ids), fields(count = recipient_ids.len()))]
    pub(crate) async fn set_recipients(
        &self,
        conn: &mut PgConnection,
        mailing_id: Uuid,
        recipient_ids: &[Uuid],
    ) -> Result<()> {
        sqlx::query("DELETE FROM mailing_recipients WHERE mailing_id = $1").bind(mailing_id).execute(&mut *conn).await?;

        if recipient_ids.is_empty() {
            return Ok(());
        }

        let result = sqlx::query(
            r#"
            INSERT INTO mailing_recipients (mailing_id, recipient_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(mailing_id)
        .bind(recipient_ids)
        .execute(conn)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => Err(AppError::NotFound),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// Finds a mailing by ID, including its recipient IDs.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn find_by_id(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<Mailing>> {
        let record =
            sqlx::query_as::<_, MailingRecord>(&format!("SELECT {MAILING_COLUMNS} FROM mailings m WHERE m.id = $1"))
                .bind(id)
                .fetch_optional(conn)
                .await?;

        Ok(record.map(Into::into))
    }

    /// Lists mailings ordered by status then start, optionally restricted to one owner.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn list(&self, conn: &mut PgConnection, owner_id: Option<Uuid>, page: Page) -> Result<Vec<Mailing>> {
        let records = sqlx::query_as::<_, MailingRecord>(&format!(
            r#"
            SELECT {MAILING_COLUMNS}
            FROM mailings m
            WHERE ($1::uuid IS NULL OR m.owner_id = $1)
            ORDER BY m.status ASC, m.start_at ASC, m.id ASC
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

    /// Mailings whose window contains `now` and that have not been disabled.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn find_open(&self, conn: &mut PgConnection, now: OffsetDateTime) -> Result<Vec<Mailing>> {
        let records = sqlx::query_as::<_, MailingRecord>(&format!(
            r#"
            SELECT {MAILING_COLUMNS}
            FROM mailings m
            WHERE m.start_at <= $1 AND m.end_at >= $1 AND m.status <> $2
            ORDER BY m.start_at ASC
            "#
        ))
        .bind(now)
        .bind(MailingStatus::DisabledByAdmin.as_str())
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Replaces the message and window of a mailing.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist.
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        message_id: Uuid,
        window: Window,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE mailings SET message_id = $2, start_at = $3, end_at = $4 WHERE id = $1")
            .bind(id)
            .bind(message_id)
            .bind(window.start())
            .bind(window.end())
            .execute(conn)
            .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23503") => Err(AppError::NotFound),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    /// Writes only the status column.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn update_status(&self, conn: &mut PgConnection, id: Uuid, status: MailingStatus) -> Result<()> {
        sqlx::query("UPDATE mailings SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Deletes a mailing together with its recipient links and delivery attempts.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn delete(&self, conn: &mut PgConnection, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM mailings WHERE id = $1").bind(id).execute(conn).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Counts all mailings.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn count(&self, conn: &mut PgConnection) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM mailings").fetch_one(conn).await?;
        Ok(count)
    }

    /// Counts mailings whose window contains `now` and that have not been disabled.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn count_active(&self, conn: &mut PgConnection, now: OffsetDateTime) -> Result<i64> {
        // Inside the window every mailing that is not disabled derives to running,
        // whether or not its stored status has caught up yet.
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM mailings WHERE start_at <= $1 AND end_at >= $1 AND status <> $2",
        )
        .bind(now)
        .bind(MailingStatus::DisabledByAdmin.as_str())
        .fetch_one(conn)
        .await?;
        Ok(count)
    }
}
