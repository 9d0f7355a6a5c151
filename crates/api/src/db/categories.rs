//! Category repository.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{Category, NewCategory};

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT title, image_url, created_at FROM categories ORDER BY title",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the title is taken.
    pub async fn create(&self, category: &NewCategory) -> Result<Category, RepositoryError> {
        let created = sqlx::query_as::<_, Category>(
            r"
            INSERT INTO categories (title, image_url)
            VALUES ($1, $2)
            RETURNING title, image_url, created_at
            ",
        )
        .bind(category.title.trim())
        .bind(&category.image_url)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "category already exists"))?;

        Ok(created)
    }

    /// Delete a category. Products in it keep existing, uncategorised.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    pub async fn delete(&self, title: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE title = $1")
            .bind(title)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
