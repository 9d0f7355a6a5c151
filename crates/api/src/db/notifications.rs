//! Notification repository.

use sqlx::PgPool;

use lasu_mart_core::{NotificationId, UserId};

use super::RepositoryError;
use crate::models::Notification;

/// Repository for notification database operations.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r"
            SELECT notification_id, user_id, message, is_read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 100
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(notifications)
    }

    /// Mark one of the user's notifications as read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the notification doesn't exist
    /// or belongs to someone else.
    pub async fn mark_read(
        &self,
        user_id: &UserId,
        id: NotificationId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE notification_id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
