use anyhow::Result;
use sqlx::types::Json;
use tikitaka_types::events::NewNotification;

use crate::Database;
use crate::models::NotificationRow;

impl Database {
    pub async fn insert_notification(&self, notification: &NewNotification) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO notifications (user_id, type, title, body, data) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(notification.user_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(Json(&notification.data))
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// A user's notifications, newest first.
    pub async fn notifications_for(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<NotificationRow>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, user_id, type, title, body, data, is_read, created_at
             FROM notifications
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn unread_notifications(&self, user_id: i64) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Mark one notification read. Only the recipient can; returns whether
    /// a row matched.
    pub async fn mark_notification_read(&self, notification_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_notifications_read(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
