//! Cart line repository.

use sqlx::PgPool;

use lasu_mart_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::{CartItem, MAX_LINE_QUANTITY};

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's cart with product names, prices and first image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let items = sqlx::query_as::<_, CartItem>(
            r"
            SELECT c.cart_line_id, c.product_id, p.product_name, p.price, c.variant, c.quantity,
                   (SELECT i.image_url FROM product_images i
                    WHERE i.product_id = p.product_id
                    ORDER BY i.created_at LIMIT 1) AS image_url
            FROM cart_lines c
            JOIN products p ON p.product_id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.created_at
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Add `quantity` of a product, accumulating onto an existing line for
    /// the same product and variant. The total is capped at
    /// [`MAX_LINE_QUANTITY`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product doesn't exist.
    pub async fn add(
        &self,
        user_id: &UserId,
        product_id: ProductId,
        variant: Option<&str>,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO cart_lines (user_id, product_id, variant, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, product_id, variant)
            DO UPDATE SET quantity =
                LEAST(cart_lines.quantity::BIGINT + EXCLUDED.quantity, $5)::INTEGER
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(variant)
        .bind(quantity.min(MAX_LINE_QUANTITY))
        .bind(MAX_LINE_QUANTITY)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "product does not exist"))?;

        Ok(())
    }

    /// Remove the line for a product and variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no such line.
    pub async fn remove(
        &self,
        user_id: &UserId,
        product_id: ProductId,
        variant: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM cart_lines
            WHERE user_id = $1 AND product_id = $2 AND variant IS NOT DISTINCT FROM $3
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(variant)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Number of lines in a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user_id: &UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM cart_lines WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}
