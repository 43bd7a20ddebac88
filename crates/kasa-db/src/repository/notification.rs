//! # Notification Repository
//!
//! Storage for user-facing alerts. Rows are write-once; the owner may mark
//! them read or delete them. Ownership is enforced by including `user_id`
//! in every mutation's WHERE clause.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kasa_core::{Notification, NotificationKind};

const SELECT_COLUMNS: &str = r#"
    id, user_id, title, message, kind, is_read, metadata, created_at
"#;

/// Repository for notification operations.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    /// Creates a new NotificationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Creates a notification for one user and returns it.
    pub async fn create(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        kind: NotificationKind,
        metadata: Option<String>,
    ) -> DbResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            kind,
            is_read: false,
            metadata,
            created_at: Utc::now(),
        };

        debug!(user_id = %user_id, kind = ?kind, "Creating notification");

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, user_id, title, message, kind, is_read, metadata, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind)
        .bind(notification.is_read)
        .bind(&notification.metadata)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(notification)
    }

    /// Lists notifications for a user, newest first.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: u32,
    ) -> DbResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM notifications \
             WHERE user_id = ?1 AND (?2 = 0 OR is_read = 0) \
             ORDER BY created_at DESC LIMIT ?3"
        );
        let notifications = sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(unread_only)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(notifications)
    }

    /// Counts unread notifications for a user.
    pub async fn unread_count(&self, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Marks one notification as read. Owner-scoped.
    pub async fn mark_read(&self, id: &str, user_id: &str) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Notification", id));
        }

        Ok(())
    }

    /// Marks all of a user's notifications as read. Returns how many changed.
    pub async fn mark_all_read(&self, user_id: &str) -> DbResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0")
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    /// Deletes one notification. Owner-scoped.
    pub async fn delete(&self, id: &str, user_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Notification", id));
        }

        Ok(())
    }
}
