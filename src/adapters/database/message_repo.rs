use crate::adapters::database::records::MessageRecord;
use crate::domain::message::Message;
use crate::domain::page::Page;
use crate::error::Result;
use sqlx::PgConnection;
use uuid::Uuid;

const MESSAGE_COLUMNS: &str = "id, owner_id, subject, body, created_at";

#[derive(Clone, Debug, Default)]
pub struct MessageRepository {}

impl MessageRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Creates a message owned by `owner_id`.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, body), err)]
    pub(crate) async fn create(
        &self,
        conn: &mut PgConnection,
        owner_id: Uuid,
        subject: &str,
        body: &str,
    ) -> Result<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "INSERT INTO messages (owner_id, subject, body) VALUES ($1, $2, $3) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(subject)
        .bind(body)
        .fetch_one(conn)
        .await?;

        Ok(record.into())
    }

    /// Finds a message by ID.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn find_by_id(&self, conn: &mut PgConnection, id: Uuid) -> Result<Option<Message>> {
        let record =
            sqlx::query_as::<_, MessageRecord>(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"))
                .bind(id)
                .fetch_optional(conn)
                .await?;

        Ok(record.map(Into::into))
    }

    /// Lists messages ordered by subject, optionally restricted to one owner.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn list(&self, conn: &mut PgConnection, owner_id: Option<Uuid>, page: Page) -> Result<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE ($1::uuid IS NULL OR owner_id = $1)
            ORDER BY subject ASC, id ASC
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

    /// Replaces the subject and body of a message.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn, body), err)]
    pub(crate) async fn update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        subject: &str,
        body: &str,
    ) -> Result<Option<Message>> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "UPDATE messages SET subject = $2, body = $3 WHERE id = $1 RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(subject)
        .bind(body)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Deletes a message. Mailings using it are removed by cascade.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn delete(&self, conn: &mut PgConnection, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1").bind(id).execute(conn).await?;
        Ok(result.rows_affected() > 0)
    }
}
