//! Product catalog repository.
//!
//! Listing and search share one filter builder so the count query and the
//! page query always agree on which rows match.

use sqlx::{PgPool, Postgres, QueryBuilder};

use lasu_mart_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::{
    NewProduct, Page, Paginated, ProductDetail, ProductFilter, ProductImage, ProductRow,
    ProductSort, ProductSummary, SearchHit, SortDirection, TrendingProduct,
};

/// Upper bound on images attached to one product.
pub const MAX_PRODUCT_IMAGES: usize = 5;

const RATING_COLUMN: &str =
    "(SELECT AVG(r.rating)::float8 FROM reviews r WHERE r.product_id = p.product_id) AS rating";

const IMAGES_COLUMN: &str = r"COALESCE(
    (SELECT array_agg(i.image_url ORDER BY i.created_at)
     FROM product_images i WHERE i.product_id = p.product_id),
    '{}') AS images";

// =============================================================================
// Query helpers
// =============================================================================

/// Append `AND ...` clauses for every set filter field.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(min) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    if !filter.categories.is_empty() {
        qb.push(" AND p.category = ANY(")
            .push_bind(filter.categories.clone())
            .push(")");
    }
    if let Some(vendor_id) = &filter.vendor_id {
        qb.push(" AND p.vendor_id = ").push_bind(vendor_id.clone());
    }
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort: ProductSort, direction: SortDirection) {
    qb.push(sort.as_sql()).push(" ").push(direction.as_sql());
    if sort == ProductSort::Rating {
        qb.push(" NULLS LAST");
    }
    // Stable pagination when the sort column ties.
    qb.push(", p.product_id");
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: Page) {
    qb.push(" LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        direction: SortDirection,
        page: Page,
    ) -> Result<Paginated<ProductSummary>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p WHERE TRUE");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        if total == 0 {
            return Ok(Paginated::empty());
        }

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            r"SELECT p.product_id, p.product_name, p.price, p.category, p.vendor_id,
                     p.description, {RATING_COLUMN}, {IMAGES_COLUMN}, p.created_at
              FROM products p WHERE TRUE"
        ));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY ");
        push_order(&mut qb, sort, direction);
        push_page(&mut qb, page);

        let data = qb
            .build_query_as::<ProductSummary>()
            .fetch_all(self.pool)
            .await?;

        Ok(Paginated {
            data,
            total_pages: page.total_pages(total),
        })
    }

    /// Rank products by similarity to a query embedding.
    ///
    /// `embedding` is a pgvector literal (see [`super::format_embedding`]).
    /// Results are ordered by negative inner product, then by `sort`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        embedding: &str,
        filter: &ProductFilter,
        sort: ProductSort,
        direction: SortDirection,
        page: Page,
    ) -> Result<Paginated<SearchHit>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM products p WHERE p.embedding IS NOT NULL",
        );
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        if total == 0 {
            return Ok(Paginated::empty());
        }

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            r"SELECT p.product_id, p.product_name, p.price, p.category, p.vendor_id,
                     p.description, {RATING_COLUMN}, {IMAGES_COLUMN},
                     (p.embedding <#> "
        ));
        qb.push_bind(embedding.to_owned());
        qb.push("::vector)::float8 AS score FROM products p WHERE p.embedding IS NOT NULL");
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY score ASC, ");
        push_order(&mut qb, sort, direction);
        push_page(&mut qb, page);

        let data = qb.build_query_as::<SearchHit>().fetch_all(self.pool).await?;

        Ok(Paginated {
            data,
            total_pages: page.total_pages(total),
        })
    }

    /// Most ordered products over the last 30 days, cancelled orders excluded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn trending(&self, limit: i64) -> Result<Vec<TrendingProduct>, RepositoryError> {
        let rows = sqlx::query_as::<_, TrendingProduct>(&format!(
            r"
            SELECT p.product_id, p.product_name, p.price, {IMAGES_COLUMN},
                   SUM(o.quantity_ordered)::int8 AS times_ordered
            FROM orders o
            JOIN products p ON p.product_id = o.product_id
            WHERE o.created_at >= NOW() - INTERVAL '30 days'
              AND o.delivery_status <> 'cancelled'
            GROUP BY p.product_id
            ORDER BY times_ordered DESC, p.product_name
            LIMIT $1
            "
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Get one product with its vendor's name and images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<ProductDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT p.product_id, p.product_name, p.price, p.category, p.vendor_id,
                   u.display_name AS vendor_name, p.description, {RATING_COLUMN},
                   p.created_at, p.updated_at
            FROM products p
            JOIN users u ON u.user_id = p.vendor_id
            WHERE p.product_id = $1
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(product) = row else {
            return Ok(None);
        };

        let images = sqlx::query_as::<_, ProductImage>(
            r"
            SELECT image_public_id, image_url
            FROM product_images
            WHERE product_id = $1
            ORDER BY created_at
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(ProductDetail { product, images }))
    }

    /// The vendor who owns a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn vendor_of(&self, id: ProductId) -> Result<Option<UserId>, RepositoryError> {
        let vendor = sqlx::query_scalar::<_, UserId>(
            "SELECT vendor_id FROM products WHERE product_id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(vendor)
    }

    /// Insert a product and its images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the category does not exist.
    pub async fn create(
        &self,
        vendor_id: &UserId,
        product: &NewProduct,
        embedding: &str,
        images: &[ProductImage],
    ) -> Result<ProductId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, ProductId>(
            r"
            INSERT INTO products (product_name, price, category, vendor_id, description, embedding)
            VALUES ($1, $2, $3, $4, $5, $6::vector)
            RETURNING product_id
            ",
        )
        .bind(&product.product_name)
        .bind(product.price)
        .bind(product.category.as_deref())
        .bind(vendor_id)
        .bind(&product.description)
        .bind(embedding)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "unknown category"))?;

        insert_images(&mut *tx, id, images).await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Replace a product's fields and append new images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is gone, or
    /// `RepositoryError::Conflict` if the image limit would be exceeded.
    pub async fn update(
        &self,
        id: ProductId,
        product: &NewProduct,
        embedding: &str,
        images: &[ProductImage],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE products
            SET product_name = $2, price = $3, category = $4, description = $5,
                embedding = $6::vector, updated_at = NOW()
            WHERE product_id = $1
            ",
        )
        .bind(id)
        .bind(&product.product_name)
        .bind(product.price)
        .bind(product.category.as_deref())
        .bind(&product.description)
        .bind(embedding)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "unknown category"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        if !images.is_empty() {
            let existing = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM product_images WHERE product_id = $1",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            let existing = usize::try_from(existing)
                .map_err(|_| RepositoryError::DataCorruption("negative image count".into()))?;
            if existing + images.len() > MAX_PRODUCT_IMAGES {
                return Err(RepositoryError::Conflict(format!(
                    "a product can have at most {MAX_PRODUCT_IMAGES} images"
                )));
            }

            insert_images(&mut *tx, id, images).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete a product and its image rows in one transaction.
    ///
    /// Returns the asset ids of the removed images so the caller can purge
    /// them from the asset host.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let public_ids = sqlx::query_scalar::<_, String>(
            "DELETE FROM product_images WHERE product_id = $1 RETURNING image_public_id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(public_ids)
    }

    /// Remove one image row from a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image isn't attached to
    /// that product.
    pub async fn delete_image(
        &self,
        id: ProductId,
        public_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM product_images WHERE product_id = $1 AND image_public_id = $2",
        )
        .bind(id)
        .bind(public_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn insert_images(
    conn: &mut sqlx::PgConnection,
    id: ProductId,
    images: &[ProductImage],
) -> Result<(), RepositoryError> {
    if images.is_empty() {
        return Ok(());
    }

    let mut qb =
        QueryBuilder::<Postgres>::new("INSERT INTO product_images (product_id, image_public_id, image_url) ");
    qb.push_values(images, |mut row, image| {
        row.push_bind(id)
            .push_bind(image.image_public_id.clone())
            .push_bind(image.image_url.clone());
    });
    qb.build()
        .execute(conn)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "image already attached"))?;

    Ok(())
}
