//! Notifications repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::NotificationStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::NotificationType,
        notification::{Notification, NotificationQuery},
    },
};

#[derive(Clone)]
pub struct NotificationsRepository {
    pool: Pool<Postgres>,
}

impl NotificationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationsRepository {
    async fn create(&self, recipient_id: i32, kind: NotificationType, message: &str) -> AppResult<Notification> {
        let row = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (recipient_id, kind, message, status, created_at)
            VALUES ($1, $2, $3, 'unread', NOW())
            RETURNING *
            "#,
        )
        .bind(recipient_id)
        .bind(kind)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_for(&self, recipient_id: i32, query: &NotificationQuery) -> AppResult<(Vec<Notification>, i64)> {
        let (limit, offset) = query.limit_offset();

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND ($2::text IS NULL OR status = $2)",
        )
        .bind(recipient_id)
        .bind(query.status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE recipient_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(recipient_id)
        .bind(query.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    async fn mark_read(&self, id: i32, recipient_id: i32) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET status = 'read' WHERE id = $1 AND recipient_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))
    }

    async fn mark_all_read(&self, recipient_id: i32) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'read' WHERE recipient_id = $1 AND status = 'unread'",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
