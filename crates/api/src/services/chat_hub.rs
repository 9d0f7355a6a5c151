//! In-process fan-out for chat sockets.
//!
//! Every open socket on a chat subscribes to that chat's broadcast channel.
//! Channels are created on first subscribe and dropped once the last
//! subscriber leaves.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use lasu_mart_core::ChatId;

use crate::models::ChatMessage;

/// Buffered events per chat before slow sockets start lagging.
const CHANNEL_CAPACITY: usize = 64;

/// Frames sent to chat sockets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ChatEvent {
    /// History, sent once right after connecting.
    PreviousMessages(Vec<ChatMessage>),
    /// A message someone just sent.
    NewMessage(ChatMessage),
    /// A frame could not be handled.
    ServerError { message: String },
}

/// Frames accepted from chat sockets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    NewMessage { body: String },
}

/// Chat id to broadcast sender.
#[derive(Debug, Default)]
pub struct ChatHub {
    channels: DashMap<ChatId, broadcast::Sender<ChatEvent>>,
}

impl ChatHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a chat, creating its channel if needed.
    pub fn subscribe(&self, chat_id: ChatId) -> broadcast::Receiver<ChatEvent> {
        self.channels
            .entry(chat_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Send an event to every socket on a chat. Returns how many received it.
    pub fn publish(&self, chat_id: ChatId, event: ChatEvent) -> usize {
        self.channels
            .get(&chat_id)
            .and_then(|tx| tx.send(event).ok())
            .unwrap_or(0)
    }

    /// Drop a chat's channel if nobody is listening any more.
    pub fn release(&self, chat_id: ChatId) {
        self.channels
            .remove_if(&chat_id, |_, tx| tx.receiver_count() == 0);
    }

    /// Number of chats with a live channel.
    #[must_use]
    pub fn active_chats(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use lasu_mart_core::{ChatMessageId, UserId};

    use super::*;

    fn message(chat_id: ChatId, body: &str) -> ChatMessage {
        ChatMessage {
            message_id: ChatMessageId::random(),
            chat_id,
            sender_id: UserId::new("buyer-1"),
            sender_name: "Ada".to_string(),
            body: body.to_string(),
            sent_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let hub = ChatHub::new();
        let chat = ChatId::random();
        let mut a = hub.subscribe(chat);
        let mut b = hub.subscribe(chat);

        let sent = message(chat, "is this still available?");
        assert_eq!(hub.publish(chat, ChatEvent::NewMessage(sent.clone())), 2);

        assert_eq!(a.recv().await.unwrap(), ChatEvent::NewMessage(sent.clone()));
        assert_eq!(b.recv().await.unwrap(), ChatEvent::NewMessage(sent));
    }

    #[test]
    fn test_publish_is_scoped_to_chat() {
        let hub = ChatHub::new();
        let chat = ChatId::random();
        let other = ChatId::random();
        let _rx = hub.subscribe(chat);

        assert_eq!(hub.publish(other, ChatEvent::NewMessage(message(other, "hi"))), 0);
    }

    #[test]
    fn test_release_drops_idle_channels_only() {
        let hub = ChatHub::new();
        let chat = ChatId::random();
        let rx = hub.subscribe(chat);

        hub.release(chat);
        assert_eq!(hub.active_chats(), 1);

        drop(rx);
        hub.release(chat);
        assert_eq!(hub.active_chats(), 0);
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(ChatEvent::ServerError {
            message: "bad frame".to_string(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event": "server_error", "data": {"message": "bad frame"}})
        );

        let frame: ClientFrame =
            serde_json::from_str(r#"{"event":"new_message","data":{"body":"hello"}}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::NewMessage {
                body: "hello".to_string()
            }
        );
    }
}
