//! Product review repository.

use sqlx::PgPool;

use lasu_mart_core::{ProductId, ReviewId, UserId};

use super::RepositoryError;
use crate::models::{NewReview, Review};

const REVIEW_SELECT: &str = r"
    SELECT r.review_id, r.user_id, r.product_id, r.rating, r.comment,
           u.display_name AS reviewer_name, u.picture_url AS reviewer_picture,
           r.created_at
    FROM reviews r
    JOIN users u ON u.user_id = r.user_id
";

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(reviews)
    }

    /// Create a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product doesn't exist.
    pub async fn create(
        &self,
        user_id: &UserId,
        review: &NewReview,
    ) -> Result<Review, RepositoryError> {
        let id = sqlx::query_scalar::<_, ReviewId>(
            r"
            INSERT INTO reviews (user_id, product_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING review_id
            ",
        )
        .bind(user_id)
        .bind(review.product_id)
        .bind(review.rating)
        .bind(review.comment.trim())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "product does not exist"))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Get a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.review_id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(review)
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE review_id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
