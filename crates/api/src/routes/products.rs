//! Catalog handlers: public listing and search, vendor CRUD.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use lasu_mart_core::{Price, ProductId};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::db::{ProductRepository, format_embedding};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{
    NewProduct, Page, Paginated, ProductDetail, ProductFilter, ProductSort, ProductSummary,
    SearchHit, SortDirection, TrendingProduct,
};
use crate::services::products::{Catalog, ImageUpload};
use crate::state::AppState;

/// How many trending products to return.
const TRENDING_LIMIT: i64 = 10;

// =============================================================================
// Query Types
// =============================================================================

/// Listing query. `category` may hold several comma-separated titles.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub category: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<ProductSort>,
    pub order: Option<SortDirection>,
}

impl ListQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter {
            min_price: self.min_price,
            max_price: self.max_price,
            categories: self
                .category
                .as_deref()
                .map(|c| {
                    c.split(',')
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            vendor_id: None,
        }
    }

    fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

/// Search query: a [`ListQuery`] plus `search_term`. Must not use
/// `#[serde(flatten)]`, which breaks numeric fields in query strings.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search_term: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub category: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<ProductSort>,
    pub order: Option<SortDirection>,
}

impl SearchQuery {
    fn into_parts(self) -> (Option<String>, ListQuery) {
        (
            self.search_term,
            ListQuery {
                min_price: self.min_price,
                max_price: self.max_price,
                category: self.category,
                page: self.page,
                limit: self.limit,
                sort_by: self.sort_by,
                order: self.order,
            },
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub public_id: String,
}

// =============================================================================
// Public
// =============================================================================

/// GET /product
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Paginated<ProductSummary>>> {
    let filter = query.filter();
    if filter.is_empty_range() {
        return Ok(Json(Paginated::empty()));
    }

    let products = ProductRepository::new(state.pool())
        .list(
            &filter,
            query.sort_by.unwrap_or_default(),
            query.order.unwrap_or_default(),
            query.page(),
        )
        .await?;
    Ok(Json(products))
}

/// Rank products by similarity to a search term.
///
/// GET /product/search
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Paginated<SearchHit>>> {
    let (term, query) = query.into_parts();
    let term = term
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("search_term is required".to_string()))?;

    let filter = query.filter();
    if filter.is_empty_range() {
        return Ok(Json(Paginated::empty()));
    }

    let embedding = state.embedder().embed(term).await?;
    let hits = ProductRepository::new(state.pool())
        .search(
            &format_embedding(&embedding),
            &filter,
            query.sort_by.unwrap_or_default(),
            query.order.unwrap_or_default(),
            query.page(),
        )
        .await?;
    Ok(Json(hits))
}

/// Most ordered products over the last 30 days.
///
/// GET /product/trending
pub async fn trending(State(state): State<AppState>) -> Result<Json<Vec<TrendingProduct>>> {
    let products = ProductRepository::new(state.pool())
        .trending(TRENDING_LIMIT)
        .await?;
    Ok(Json(products))
}

/// GET /product/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

// =============================================================================
// Vendor
// =============================================================================

/// The caller's own products.
///
/// GET /product/vendor
pub async fn vendor_products(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ListQuery>,
) -> Result<Json<Paginated<ProductSummary>>> {
    let filter = ProductFilter {
        vendor_id: Some(user.uid),
        ..query.filter()
    };
    if filter.is_empty_range() {
        return Ok(Json(Paginated::empty()));
    }

    let products = ProductRepository::new(state.pool())
        .list(
            &filter,
            query.sort_by.unwrap_or_default(),
            query.order.unwrap_or_default(),
            query.page(),
        )
        .await?;
    Ok(Json(products))
}

/// List a new product.
///
/// POST /product/vendor (multipart: `product_name`, `price`, `category`,
/// `description`, up to five `images`)
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>)> {
    let (product, images) = read_product_form(multipart).await?;

    let id = Catalog::new(state.pool(), state.assets(), state.embedder())
        .create(&user, &product, images, state.email())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Product created", "product_id": id })),
    ))
}

/// Edit a product and append images.
///
/// POST /product/vendor/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let (product, images) = read_product_form(multipart).await?;

    Catalog::new(state.pool(), state.assets(), state.embedder())
        .update(id, &user.uid, &product, images)
        .await?;

    Ok(Json(json!({ "message": "Product updated", "product_id": id })))
}

/// DELETE /product/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<Value>> {
    Catalog::new(state.pool(), state.assets(), state.embedder())
        .delete(id, &user.uid)
        .await?;

    Ok(Json(json!({ "message": "Product deleted" })))
}

/// DELETE /product/{id}/images?public_id=...
pub async fn delete_image(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    Query(query): Query<ImageQuery>,
) -> Result<Json<Value>> {
    Catalog::new(state.pool(), state.assets(), state.embedder())
        .delete_image(id, &query.public_id, &user.uid)
        .await?;

    Ok(Json(json!({ "message": "Image deleted" })))
}

// =============================================================================
// Multipart form
// =============================================================================

fn multipart_error(e: &axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(e.body_text())
}

async fn read_product_form(mut multipart: Multipart) -> Result<(NewProduct, Vec<ImageUpload>)> {
    let mut name = None;
    let mut price = None;
    let mut category = None;
    let mut description = None;
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        let Some(field_name) = field.name().map(String::from) else {
            continue;
        };

        if field_name == "images" {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
            if !bytes.is_empty() {
                images.push(ImageUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let text = field.text().await.map_err(|e| multipart_error(&e))?;
        match field_name.as_str() {
            "product_name" | "productName" => name = Some(text),
            "price" => price = Some(text),
            "category" => category = Some(text),
            "description" => description = Some(text),
            _ => {}
        }
    }

    let product_name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest("product_name is required".to_string()))?;
    let price = price
        .ok_or_else(|| AppError::BadRequest("price is required".to_string()))?
        .parse::<Price>()
        .map_err(|e| AppError::BadRequest(format!("Invalid price: {e}")))?;

    Ok((
        NewProduct {
            product_name,
            price,
            category: category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            description: description.unwrap_or_default().trim().to_string(),
        },
        images,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_split_on_commas() {
        let query = ListQuery {
            category: Some("Books, Electronics,,".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(query.filter().categories, vec!["Books", "Electronics"]);
        assert!(ListQuery::default().filter().categories.is_empty());
    }
}
