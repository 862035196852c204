use crate::adapters::database::records::DeliveryAttemptRecord;
use crate::domain::delivery::{AttemptSummary, DeliveryAttempt, DeliveryOutcome};
use crate::domain::page::Page;
use crate::error::Result;
use sqlx::{FromRow, PgConnection};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct SummaryRow {
    success: i64,
    failure: i64,
    total: i64,
}

/// Values of one attempt about to be recorded.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NewAttempt<'a> {
    pub mailing_id: Uuid,
    pub recipient_id: Uuid,
    pub recipient_email: &'a str,
    pub outcome: DeliveryOutcome,
    pub response: &'a str,
    pub attempted_at: OffsetDateTime,
}

#[derive(Clone, Debug, Default)]
pub struct DeliveryRepository {}

impl DeliveryRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Appends one attempt. Attempts are never updated afterwards.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(
        level = "debug",
        skip(self, conn, attempt),
        fields(mailing_id = %attempt.mailing_id, outcome = %attempt.outcome),
        err
    )]
    pub(crate) async fn record(&self, conn: &mut PgConnection, attempt: NewAttempt<'_>) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO delivery_attempts (id, mailing_id, recipient_id, recipient_email, outcome, response, attempted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(attempt.mailing_id)
        .bind(attempt.recipient_id)
        .bind(attempt.recipient_email)
        .bind(attempt.outcome.as_str())
        .bind(attempt.response)
        .bind(attempt.attempted_at)
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    /// Lists attempts newest first. `owner_id` restricts to mailings of that owner.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn list(
        &self,
        conn: &mut PgConnection,
        owner_id: Option<Uuid>,
        mailing_id: Option<Uuid>,
        page: Page,
    ) -> Result<Vec<DeliveryAttempt>> {
        let records = sqlx::query_as::<_, DeliveryAttemptRecord>(
            r#"
            SELECT a.id, a.mailing_id, a.recipient_id, a.recipient_email, a.outcome, a.response, a.attempted_at
            FROM delivery_attempts a
            JOIN mailings m ON m.id = a.mailing_id
            WHERE ($1::uuid IS NULL OR m.owner_id = $1)
              AND ($2::uuid IS NULL OR a.mailing_id = $2)
            ORDER BY a.attempted_at DESC, a.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(owner_id)
        .bind(mailing_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Counts attempts by outcome, optionally for a single mailing.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn summarize(&self, conn: &mut PgConnection, mailing_id: Option<Uuid>) -> Result<AttemptSummary> {
        let row = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE outcome = 'success') AS success,
                COUNT(*) FILTER (WHERE outcome = 'failure') AS failure,
                COUNT(*) AS total
            FROM delivery_attempts
            WHERE ($1::uuid IS NULL OR mailing_id = $1)
            "#,
        )
        .bind(mailing_id)
        .fetch_one(conn)
        .await?;

        Ok(AttemptSummary { success: row.success, failure: row.failure, total: row.total })
    }
}
