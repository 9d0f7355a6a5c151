//! Notification models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use lasu_mart_core::{NotificationId, UserId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub notification_id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
