//! Notification handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use lasu_mart_core::NotificationId;
use serde_json::{Value, json};

use crate::db::NotificationRepository;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Notification;
use crate::state::AppState;

/// GET /notifications
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Notification>>> {
    let notifications = NotificationRepository::new(state.pool())
        .list(&user.uid)
        .await?;
    Ok(Json(notifications))
}

/// Mark one notification read.
///
/// POST /notifications/{id}
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NotificationId>,
) -> Result<Json<Value>> {
    NotificationRepository::new(state.pool())
        .mark_read(&user.uid, id)
        .await?;
    Ok(Json(json!({ "message": "Notification marked as read" })))
}
