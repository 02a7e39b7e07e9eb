//! Notification repository for database operations.

use crate::entities::notification::{Notification, NotificationType};
use crate::types::{NotificationError, NotificationResult};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;

/// Repository for notification database operations
#[derive(Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    /// Create a new notification repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new notification
    pub async fn create(
        &self,
        user_id: i64,
        notification_type: NotificationType,
        title: &str,
        body: &str,
    ) -> NotificationResult<Notification> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO notifications (user_id, notification_type, title, body, read, created_at) VALUES (?, ?, ?, ?, false, ?)"
        )
        .bind(user_id)
        .bind(notification_type.to_string())
        .bind(title)
        .bind(body)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        let notification_id = result.last_insert_rowid();
        self.find_by_id(notification_id).await?.ok_or_else(|| {
            NotificationError::DatabaseError("Failed to retrieve created notification".to_string())
        })
    }

    /// Create a notification, swallowing failures.
    ///
    /// Notifications are side effects of other mutations and must never
    /// fail the mutation that produced them.
    pub async fn notify(
        &self,
        user_id: i64,
        notification_type: NotificationType,
        title: &str,
        body: &str,
    ) {
        if let Err(error) = self.create(user_id, notification_type, title, body).await {
            warn!(user_id, %error, "failed to create notification");
        }
    }

    /// Find notification by ID
    pub async fn find_by_id(&self, id: i64) -> NotificationResult<Option<Notification>> {
        sqlx::query_as::<_, Notification>(
            "SELECT id, user_id, notification_type, title, body, read, created_at FROM notifications WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| NotificationError::DatabaseError(e.to_string()))
    }

    /// Find notifications for a user, newest first
    pub async fn find_by_user_id(
        &self,
        user_id: i64,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> NotificationResult<Vec<Notification>> {
        let query = if unread_only {
            "SELECT id, user_id, notification_type, title, body, read, created_at FROM notifications WHERE user_id = ? AND read = false ORDER BY created_at DESC LIMIT ? OFFSET ?"
        } else {
            "SELECT id, user_id, notification_type, title, body, read, created_at FROM notifications WHERE user_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?"
        };

        sqlx::query_as::<_, Notification>(query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))
    }

    /// Count unread notifications for a user
    pub async fn unread_count(&self, user_id: i64) -> NotificationResult<i64> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = false",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(count.unwrap_or(0))
    }

    /// Mark a single notification as read
    pub async fn mark_read(&self, id: i64, user_id: i64) -> NotificationResult<Notification> {
        let result = sqlx::query("UPDATE notifications SET read = true WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::NotificationNotFound);
        }

        self.find_by_id(id)
            .await?
            .ok_or(NotificationError::NotificationNotFound)
    }

    /// Mark every notification for a user as read, returning the count
    pub async fn mark_all_read(&self, user_id: i64) -> NotificationResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET read = true WHERE user_id = ? AND read = false")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| NotificationError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
