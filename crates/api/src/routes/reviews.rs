//! Product review handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use lasu_mart_core::{ProductId, ReviewId};
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::db::{RepositoryError, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{NewReview, Review};
use crate::state::AppState;

/// GET /reviews/{product_id}
pub async fn list(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Vec<Review>>> {
    let reviews = ReviewRepository::new(state.pool())
        .list_for_product(product_id)
        .await?;
    Ok(Json(reviews))
}

/// POST /reviews
#[instrument(skip(state, user, body), fields(user_id = %user.uid, product_id = %body.product_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(mut body): Json<NewReview>,
) -> Result<(StatusCode, Json<Review>)> {
    body.comment = body.comment.trim().to_string();
    if body.comment.is_empty() {
        return Err(AppError::BadRequest("Comment cannot be empty".to_string()));
    }

    let review = ReviewRepository::new(state.pool())
        .create(&user.uid, &body)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AppError::NotFound("Product not found".to_string()),
            other => other.into(),
        })?;

    info!(review_id = %review.review_id, "Review added");
    Ok((StatusCode::CREATED, Json(review)))
}

/// Delete a review. Authors can delete their own; admins can delete any.
///
/// DELETE /reviews/{review_id}
#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(review_id): Path<ReviewId>,
) -> Result<Json<Value>> {
    let reviews = ReviewRepository::new(state.pool());
    let review = reviews
        .get(review_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

    if review.user_id != user.uid && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only the author can delete this review".to_string(),
        ));
    }

    reviews.delete(review_id).await?;
    Ok(Json(json!({ "message": "Review deleted" })))
}
