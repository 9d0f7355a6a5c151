//! Catalog models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lasu_mart_core::{Price, ProductId, UserId};

/// A product as shown in listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductSummary {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Price,
    pub category: Option<String>,
    pub vendor_id: UserId,
    pub description: String,
    /// Average review rating, `None` when unreviewed.
    pub rating: Option<f64>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// The single-product row, joined with the vendor's display name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductRow {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Price,
    pub category: Option<String>,
    pub vendor_id: UserId,
    pub vendor_name: String,
    pub description: String,
    pub rating: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `GET /product/{id}` response.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductRow,
    pub images: Vec<ProductImage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub image_public_id: String,
    pub image_url: String,
}

/// Ranked search result.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SearchHit {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Price,
    pub category: Option<String>,
    pub vendor_id: UserId,
    pub description: String,
    pub rating: Option<f64>,
    pub images: Vec<String>,
    /// Negative inner product; lower is more similar.
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TrendingProduct {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Price,
    pub images: Vec<String>,
    pub times_ordered: i64,
}

/// Fields a vendor supplies when listing or editing a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub product_name: String,
    pub price: Price,
    pub category: Option<String>,
    pub description: String,
}

impl NewProduct {
    /// Text sent to the embedding service for this product.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        format!(
            "{} {} {}",
            self.product_name,
            self.description,
            self.category.as_deref().unwrap_or_default()
        )
        .trim_end()
        .to_string()
    }
}

/// Whitelisted product sort columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    #[serde(alias = "date_added")]
    CreatedAt,
    Price,
    #[serde(alias = "ratings")]
    Rating,
}

impl ProductSort {
    /// SQL expression for this column (the product table is aliased `p`).
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::CreatedAt => "p.created_at",
            Self::Price => "p.price",
            Self::Rating => "rating",
        }
    }
}

/// Listing filters. Price bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub categories: Vec<String>,
    pub vendor_id: Option<UserId>,
}

impl ProductFilter {
    /// True when the bounds cannot match anything (`min > max`).
    #[must_use]
    pub fn is_empty_range(&self) -> bool {
        matches!((self.min_price, self.max_price), (Some(min), Some(max)) if min > max)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_joins_fields() {
        let product = NewProduct {
            product_name: "Desk lamp".to_string(),
            price: "4500".parse().unwrap(),
            category: Some("Electronics".to_string()),
            description: "Warm LED".to_string(),
        };
        assert_eq!(product.embedding_text(), "Desk lamp Warm LED Electronics");
    }

    #[test]
    fn test_embedding_text_without_category() {
        let product = NewProduct {
            product_name: "Desk lamp".to_string(),
            price: "4500".parse().unwrap(),
            category: None,
            description: "Warm LED".to_string(),
        };
        assert_eq!(product.embedding_text(), "Desk lamp Warm LED");
    }

    #[test]
    fn test_sort_accepts_legacy_names() {
        let sort: ProductSort = serde_json::from_str("\"date_added\"").unwrap();
        assert_eq!(sort, ProductSort::CreatedAt);
        let sort: ProductSort = serde_json::from_str("\"ratings\"").unwrap();
        assert_eq!(sort.as_sql(), "rating");
        assert!(serde_json::from_str::<ProductSort>("\"price; DROP TABLE\"").is_err());
    }

    #[test]
    fn test_empty_range() {
        let filter = ProductFilter {
            min_price: Some("500".parse().unwrap()),
            max_price: Some("100".parse().unwrap()),
            ..ProductFilter::default()
        };
        assert!(filter.is_empty_range());
        assert!(!ProductFilter::default().is_empty_range());
    }
}
