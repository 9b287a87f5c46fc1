//! Message repository.
//!
//! Inbox/outbox are always scoped to the authenticated caller's user id;
//! the ids never come from request parameters.

use sqlx::PgPool;

use super::query::{bind_query_as, bind_query_scalar, BindValue, Page, Paged, QueryBuilder};
use crate::error::Error;
use crate::models::{CreateMessageRequest, Message};
use crate::Result;

const ORDER: &str = "sent_at DESC, id DESC";

#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, sender_id: i64, request: &CreateMessageRequest) -> Result<Message> {
        sqlx::query_as::<_, Message>(
            "INSERT INTO messages (sender_id, recipient_id, subject, body) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(sender_id)
        .bind(request.recipient_id)
        .bind(&request.subject)
        .bind(&request.body)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::store("send message", e))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Message>> {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("find message by id", e))
    }

    pub async fn inbox(
        &self,
        recipient_id: i64,
        unread_only: bool,
        page: Page,
    ) -> Result<Paged<Message>> {
        let mut builder =
            QueryBuilder::new("SELECT * FROM messages", "SELECT COUNT(*) FROM messages");
        builder.filter_eq("recipient_id", BindValue::Int(recipient_id));
        if unread_only {
            builder.filter_literal("is_read = FALSE");
        }
        builder.order_by(ORDER);
        builder.paginate(page);

        self.fetch_page(builder, "list inbox", "count inbox").await
    }

    pub async fn outbox(&self, sender_id: i64, page: Page) -> Result<Paged<Message>> {
        let mut builder =
            QueryBuilder::new("SELECT * FROM messages", "SELECT COUNT(*) FROM messages");
        builder.filter_eq("sender_id", BindValue::Int(sender_id));
        builder.order_by(ORDER);
        builder.paginate(page);

        self.fetch_page(builder, "list outbox", "count outbox").await
    }

    async fn fetch_page(
        &self,
        builder: QueryBuilder,
        list_op: &'static str,
        count_op: &'static str,
    ) -> Result<Paged<Message>> {
        let (sql, binds) = builder.build();
        let items = bind_query_as(sqlx::query_as::<_, Message>(&sql), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store(list_op, e))?;

        let (count_sql, count_binds) = builder.build_count();
        let total = bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql), count_binds)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::store(count_op, e))?;

        Ok(Paged { items, total })
    }

    /// Flip the read flag. The recipient-only rule is enforced by the
    /// policy engine before this runs.
    pub async fn mark_read(&self, id: i64) -> Result<Option<Message>> {
        sqlx::query_as::<_, Message>(
            "UPDATE messages SET is_read = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::store("mark message read", e))
    }

    pub async fn delete(&self, id: i64) -> Result<Option<Message>> {
        sqlx::query_as::<_, Message>("DELETE FROM messages WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("delete message", e))
    }
}
