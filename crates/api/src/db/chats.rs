//! Database operations for buyer/vendor chats and their messages.

use sqlx::PgPool;

use lasu_mart_core::{ChatId, UserId};

use super::RepositoryError;
use crate::models::{ChatMessage, ChatSummary};

const SUMMARY_SELECT: &str = r"
    SELECT c.chat_id, c.user_id, bu.display_name AS user_name,
           c.vendor_id, vu.display_name AS vendor_name,
           last.body AS last_message, last.sent_at AS last_sent_at,
           c.created_at
    FROM chats c
    JOIN users bu ON bu.user_id = c.user_id
    JOIN users vu ON vu.user_id = c.vendor_id
    LEFT JOIN LATERAL (
        SELECT m.body, m.sent_at FROM chat_messages m
        WHERE m.chat_id = c.chat_id
        ORDER BY m.sent_at DESC LIMIT 1
    ) last ON TRUE
";

/// Repository for chat database operations.
pub struct ChatRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ChatRepository<'a> {
    /// Create a new chat repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the chat between a buyer and a vendor, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if either user doesn't exist.
    pub async fn find_or_create(
        &self,
        user_id: &UserId,
        vendor_id: &UserId,
    ) -> Result<ChatId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ChatId>(
            r"
            INSERT INTO chats (user_id, vendor_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, vendor_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING chat_id
            ",
        )
        .bind(user_id)
        .bind(vendor_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "vendor does not exist"))?;

        Ok(id)
    }

    /// Get a chat by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ChatId) -> Result<Option<ChatSummary>, RepositoryError> {
        let chat = sqlx::query_as::<_, ChatSummary>(&format!(
            "{SUMMARY_SELECT} WHERE c.chat_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(chat)
    }

    /// Chats the user takes part in, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for(&self, uid: &UserId) -> Result<Vec<ChatSummary>, RepositoryError> {
        let chats = sqlx::query_as::<_, ChatSummary>(&format!(
            r"{SUMMARY_SELECT}
            WHERE c.user_id = $1 OR c.vendor_id = $1
            ORDER BY COALESCE(last.sent_at, c.created_at) DESC"
        ))
        .bind(uid)
        .fetch_all(self.pool)
        .await?;

        Ok(chats)
    }

    /// Messages in a chat, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn messages(&self, id: ChatId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let messages = sqlx::query_as::<_, ChatMessage>(
            r"
            SELECT message_id, chat_id, sender_id, sender_name, body, sent_at
            FROM chat_messages
            WHERE chat_id = $1
            ORDER BY sent_at
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(messages)
    }

    /// Append a message to a chat.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the chat doesn't exist.
    pub async fn add_message(
        &self,
        id: ChatId,
        sender_id: &UserId,
        sender_name: &str,
        body: &str,
    ) -> Result<ChatMessage, RepositoryError> {
        let message = sqlx::query_as::<_, ChatMessage>(
            r"
            INSERT INTO chat_messages (chat_id, sender_id, sender_name, body)
            VALUES ($1, $2, $3, $4)
            RETURNING message_id, chat_id, sender_id, sender_name, body, sent_at
            ",
        )
        .bind(id)
        .bind(sender_id)
        .bind(sender_name)
        .bind(body)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "chat does not exist"))?;

        Ok(message)
    }
}
