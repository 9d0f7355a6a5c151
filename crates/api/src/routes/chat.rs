//! Buyer/vendor chat: REST handlers and the WebSocket channel.
//!
//! Messages are persisted first, then fanned out through the in-process
//! [`ChatHub`](crate::services::chat_hub::ChatHub) to every socket open on
//! the same chat.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use lasu_mart_core::ChatId;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::db::{ChatRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{ChatMessage, ChatSummary, CurrentUser, StartChat};
use crate::services::chat_hub::{ChatEvent, ClientFrame};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SocketQuery {
    pub chat_id: ChatId,
}

#[derive(Debug, Serialize)]
pub struct StartedChat {
    pub chat_id: ChatId,
    pub message: ChatMessage,
}

/// Load a chat and check the caller takes part in it.
async fn participant_chat(state: &AppState, chat_id: ChatId, user: &CurrentUser) -> Result<ChatSummary> {
    let chat = ChatRepository::new(state.pool())
        .get(chat_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chat not found".to_string()))?;

    if !chat.has_participant(&user.uid) {
        return Err(AppError::Forbidden(
            "You are not a participant in this chat".to_string(),
        ));
    }
    Ok(chat)
}

fn message_body(raw: &str) -> Result<&str> {
    let body = raw.trim();
    if body.is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }
    Ok(body)
}

// =============================================================================
// REST
// =============================================================================

/// GET /chat
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ChatSummary>>> {
    let chats = ChatRepository::new(state.pool()).list_for(&user.uid).await?;
    Ok(Json(chats))
}

/// Start (or continue) a chat with a vendor.
///
/// POST /chat
#[instrument(skip(state, user, body), fields(user_id = %user.uid, vendor_id = %body.vendor_id))]
pub async fn start(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<StartChat>,
) -> Result<(StatusCode, Json<StartedChat>)> {
    if body.vendor_id == user.uid {
        return Err(AppError::BadRequest(
            "You cannot start a chat with yourself".to_string(),
        ));
    }
    let text = message_body(&body.message)?;

    let chats = ChatRepository::new(state.pool());
    let chat_id = chats
        .find_or_create(&user.uid, &body.vendor_id)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AppError::NotFound("Vendor not found".to_string()),
            other => other.into(),
        })?;

    let message = chats
        .add_message(chat_id, &user.uid, &user.display_name, text)
        .await?;
    state
        .chat_hub()
        .publish(chat_id, ChatEvent::NewMessage(message.clone()));

    Ok((StatusCode::CREATED, Json(StartedChat { chat_id, message })))
}

/// GET /chat/{chat_id}
pub async fn messages(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<Vec<ChatMessage>>> {
    participant_chat(&state, chat_id, &user).await?;
    let messages = ChatRepository::new(state.pool()).messages(chat_id).await?;
    Ok(Json(messages))
}

// =============================================================================
// WebSocket
// =============================================================================

/// Upgrade to the chat socket once the caller is known to be a participant.
///
/// GET /chat/socket?chat_id=...
pub async fn socket(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<SocketQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    let chat = participant_chat(&state, query.chat_id, &user).await?;
    let history = ChatRepository::new(state.pool())
        .messages(chat.chat_id)
        .await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user, chat.chat_id, history)))
}

fn frame(event: &ChatEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize chat event");
            None
        }
    }
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    user: CurrentUser,
    chat_id: ChatId,
    history: Vec<ChatMessage>,
) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before sending history so nothing falls in between.
    let mut events = state.chat_hub().subscribe(chat_id);
    // Replies meant for this socket only.
    let (direct_tx, mut direct_rx) = mpsc::channel::<ChatEvent>(8);

    info!(chat_id = %chat_id, user_id = %user.uid, "Chat socket connected");

    if let Some(msg) = frame(&ChatEvent::PreviousMessages(history))
        && sender.send(msg).await.is_err()
    {
        drop(events);
        state.chat_hub().release(chat_id);
        return;
    }

    let mut forward_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(chat_id = %chat_id, skipped, "Chat socket lagging");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                Some(event) = direct_rx.recv() => event,
            };

            let Some(msg) = frame(&event) else { continue };
            if let Err(e) = sender.send(msg).await {
                debug!(chat_id = %chat_id, error = %e, "Failed to send chat frame");
                break;
            }
        }
    });

    let receive_state = state.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let text = match msg {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    debug!(chat_id = %chat_id, error = %e, "Chat socket error");
                    break;
                }
                Ok(_) => continue,
            };

            if let Err(e) = handle_frame(&receive_state, &user, chat_id, text.as_str()).await {
                let reply = ChatEvent::ServerError {
                    message: e.to_string(),
                };
                if direct_tx.send(reply).await.is_err() {
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut forward_task => shut_down(receive_task).await,
        _ = &mut receive_task => shut_down(forward_task).await,
    }

    state.chat_hub().release(chat_id);
    info!(chat_id = %chat_id, "Chat socket disconnected");
}

/// Abort a socket task and wait until it has dropped everything it owned,
/// including its hub receiver.
async fn shut_down(task: JoinHandle<()>) {
    task.abort();
    if let Err(e) = task.await
        && !e.is_cancelled()
    {
        warn!(error = %e, "Chat socket task panicked");
    }
}

/// Errors reported back over the socket.
#[derive(Debug, thiserror::Error)]
enum FrameError {
    #[error("unrecognised frame")]
    Malformed,
    #[error("message cannot be empty")]
    Empty,
    #[error("message could not be saved")]
    Storage(#[from] RepositoryError),
}

async fn handle_frame(
    state: &AppState,
    user: &CurrentUser,
    chat_id: ChatId,
    text: &str,
) -> std::result::Result<(), FrameError> {
    let ClientFrame::NewMessage { body } =
        serde_json::from_str(text).map_err(|_| FrameError::Malformed)?;
    let body = body.trim();
    if body.is_empty() {
        return Err(FrameError::Empty);
    }

    let message = ChatRepository::new(state.pool())
        .add_message(chat_id, &user.uid, &user.display_name, body)
        .await
        .inspect_err(|e| warn!(chat_id = %chat_id, error = %e, "Failed to store chat message"))?;

    state
        .chat_hub()
        .publish(chat_id, ChatEvent::NewMessage(message));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::chat_hub::ChatHub;

    #[test]
    fn test_message_body_is_trimmed() {
        assert_eq!(message_body("  hello  ").ok(), Some("hello"));
        assert!(message_body("   ").is_err());
    }

    #[tokio::test]
    async fn test_shut_down_lets_hub_drop_the_channel() {
        let hub = ChatHub::new();
        let chat = ChatId::random();
        let mut events = hub.subscribe(chat);
        let forward = tokio::spawn(async move {
            let _ = events.recv().await;
        });

        shut_down(forward).await;
        hub.release(chat);

        assert_eq!(hub.active_chats(), 0);
    }

    #[tokio::test]
    async fn test_release_keeps_channel_while_other_sockets_listen() {
        let hub = ChatHub::new();
        let chat = ChatId::random();
        let _other_socket = hub.subscribe(chat);
        let mut events = hub.subscribe(chat);
        let forward = tokio::spawn(async move {
            let _ = events.recv().await;
        });

        shut_down(forward).await;
        hub.release(chat);

        assert_eq!(hub.active_chats(), 1);
    }
}
