//! Review models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lasu_mart_core::{ProductId, Rating, ReviewId, UserId};

/// A review with the reviewer's public profile.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub review_id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub rating: Rating,
    pub comment: String,
    pub reviewer_name: String,
    pub reviewer_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub product_id: ProductId,
    #[serde(alias = "ratings")]
    pub rating: Rating,
    pub comment: String,
}
