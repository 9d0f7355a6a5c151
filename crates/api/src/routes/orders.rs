//! Order handlers for buyers and vendors.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use lasu_mart_core::{DeliveryStatus, OrderId, PaymentMethod};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::{OrderRepository, UserRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderDetail, OrderSort, OrderView, Page, Paginated, SortDirection};
use crate::services::orders;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Listing query. `status` may hold several comma-separated statuses;
/// absent means all of them.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub sort_by: Option<OrderSort>,
    pub order: Option<SortDirection>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl OrderListQuery {
    fn statuses(&self) -> Result<Vec<DeliveryStatus>> {
        self.status
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<DeliveryStatus>().map_err(AppError::BadRequest))
            .collect()
    }
}

/// Both fields fall back to the buyer's profile.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "paymentMethod")]
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    #[serde(alias = "delivery_status")]
    pub status: DeliveryStatus,
}

#[derive(Debug, Serialize)]
pub struct PlacedOrders {
    pub orders: Vec<Order>,
}

// =============================================================================
// Buyer
// =============================================================================

/// GET /orders/user
pub async fn history(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Paginated<OrderView>>> {
    let statuses = query.statuses()?;
    let orders = OrderRepository::new(state.pool())
        .list_for_buyer(
            &user.uid,
            &statuses,
            query.sort_by.unwrap_or_default(),
            query.order.unwrap_or_default(),
            Page::new(query.page, query.limit),
        )
        .await?;
    Ok(Json(orders))
}

/// Turn the caller's cart into orders.
///
/// POST /orders/user
///
/// The address defaults to the profile address and the payment method to
/// the profile preference.
#[instrument(skip(state, user, body), fields(user_id = %user.uid))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrders>)> {
    let profile = UserRepository::new(state.pool())
        .get_profile(&user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let address = body
        .address
        .filter(|a| !a.trim().is_empty())
        .or(profile.address)
        .unwrap_or_default();
    let payment_method =
        PaymentMethod::resolve(body.payment_method, profile.preferred_payment_method);

    let orders = orders::place(state.pool(), &user.uid, &address, payment_method).await?;

    let count = orders.len().to_string();
    add_breadcrumb("order", "Placed orders", Some(&[("count", count.as_str())]));

    Ok((StatusCode::CREATED, Json(PlacedOrders { orders })))
}

/// GET /orders/user/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let detail = orders::view(state.pool(), id, &user.uid).await?;
    Ok(Json(detail))
}

/// Cancel one of the caller's open orders.
///
/// DELETE /orders/user/{id}
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = orders::cancel(state.pool(), id, &user.uid).await?;
    Ok(Json(order))
}

// =============================================================================
// Vendor
// =============================================================================

/// Orders against the caller's products.
///
/// GET /orders/vendor
pub async fn vendor_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Paginated<OrderView>>> {
    let statuses = query.statuses()?;
    let orders = OrderRepository::new(state.pool())
        .list_for_vendor(
            &user.uid,
            &statuses,
            query.sort_by.unwrap_or_default(),
            query.order.unwrap_or_default(),
            Page::new(query.page, query.limit),
        )
        .await?;
    Ok(Json(orders))
}

/// POST /orders/vendor/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = orders::update_status(state.pool(), id, &user.uid, body.status).await?;
    Ok(Json(order))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(status: Option<&str>) -> OrderListQuery {
        OrderListQuery {
            status: status.map(String::from),
            ..OrderListQuery::default()
        }
    }

    #[test]
    fn test_absent_status_means_all() {
        assert!(query(None).statuses().unwrap().is_empty());
        assert!(query(Some("")).statuses().unwrap().is_empty());
    }

    #[test]
    fn test_status_list_parsing() {
        assert_eq!(
            query(Some("pending, delivering")).statuses().unwrap(),
            vec![DeliveryStatus::Pending, DeliveryStatus::Active]
        );
        assert!(query(Some("pending,shipped")).statuses().is_err());
    }
}
