//! Category handlers. Reads are public; writes are admin only.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use tracing::instrument;

use crate::db::CategoryRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Category, NewCategory};
use crate::state::AppState;

/// GET /category
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Json(categories))
}

/// POST /category
#[instrument(skip(state, admin), fields(admin = %admin.uid))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = NewCategory {
        title: body.title.trim().to_string(),
        image_url: body.image_url.trim().to_string(),
    };
    if category.title.is_empty() {
        return Err(AppError::BadRequest("Title cannot be empty".to_string()));
    }

    let category = CategoryRepository::new(state.pool())
        .create(&category)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// DELETE /category/{title}
#[instrument(skip(state, admin), fields(admin = %admin.uid))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(title): Path<String>,
) -> Result<Json<Value>> {
    CategoryRepository::new(state.pool()).delete(&title).await?;
    Ok(Json(json!({ "message": "Category deleted" })))
}
