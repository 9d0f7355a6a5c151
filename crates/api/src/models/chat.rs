//! Chat models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lasu_mart_core::{ChatId, ChatMessageId, UserId};

/// A conversation as listed by `GET /chat`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatSummary {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub user_name: String,
    pub vendor_id: UserId,
    pub vendor_name: String,
    pub last_message: Option<String>,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ChatSummary {
    #[must_use]
    pub fn has_participant(&self, uid: &UserId) -> bool {
        &self.user_id == uid || &self.vendor_id == uid
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub message_id: ChatMessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// `POST /chat` body.
#[derive(Debug, Clone, Deserialize)]
pub struct StartChat {
    pub vendor_id: UserId,
    pub message: String,
}
