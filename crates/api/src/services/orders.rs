//! Order placement and lifecycle.
//!
//! Placing an order turns every line in the buyer's cart into an order row
//! and empties the cart, all in one transaction. Either every line becomes
//! an order or nothing changes.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use lasu_mart_core::{
    DeliveryStatus, OrderId, PaymentMethod, ProductId, StatusTransitionError, UserId,
};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::{CartLineSnapshot, Order, OrderDetail, OrderDraft};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A cart line points at a product that no longer exists.
    ///
    /// Deleting a product cascades to its cart lines, so this only fires
    /// when the product is deleted between locking the cart and reading the
    /// product row.
    #[error("product {0} is no longer available")]
    ProductUnavailable(ProductId),

    #[error("order not found")]
    NotFound,

    /// The caller is not the party allowed to do this.
    #[error("not allowed to access this order")]
    Forbidden,

    #[error("a delivery address is required")]
    MissingAddress,

    #[error("a {0} order cannot be cancelled")]
    NotCancellable(DeliveryStatus),

    #[error(transparent)]
    InvalidTransition(#[from] StatusTransitionError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

// =============================================================================
// Pure rules
// =============================================================================

/// Build one order draft per locked cart line.
///
/// # Errors
///
/// Returns [`OrderError::ProductUnavailable`] for the first line whose
/// product row is gone.
pub fn plan_orders(lines: &[CartLineSnapshot]) -> Result<Vec<OrderDraft>, OrderError> {
    lines
        .iter()
        .map(|line| {
            let (Some(product_name), Some(unit_price), Some(vendor_id)) = (
                line.product_name.clone(),
                line.unit_price,
                line.vendor_id.clone(),
            ) else {
                return Err(OrderError::ProductUnavailable(line.product_id));
            };

            Ok(OrderDraft {
                cart_line_id: line.cart_line_id,
                product_id: line.product_id,
                product_name,
                unit_price,
                variant: line.variant.clone(),
                vendor_id,
                quantity: line.quantity,
            })
        })
        .collect()
}

/// One notification per distinct vendor, in first-seen order.
#[must_use]
pub fn vendor_notifications(drafts: &[OrderDraft]) -> Vec<(UserId, String)> {
    let mut counts: Vec<(UserId, usize)> = Vec::new();
    for draft in drafts {
        match counts.iter_mut().find(|(vendor, _)| *vendor == draft.vendor_id) {
            Some((_, count)) => *count += 1,
            None => counts.push((draft.vendor_id.clone(), 1)),
        }
    }

    counts
        .into_iter()
        .map(|(vendor, count)| {
            let message = if count == 1 {
                "You have a new order".to_string()
            } else {
                format!("You have {count} new orders")
            };
            (vendor, message)
        })
        .collect()
}

/// Only the buyer may cancel, and only while the order is still open.
///
/// # Errors
///
/// Returns [`OrderError::Forbidden`] or [`OrderError::NotCancellable`].
pub fn authorize_cancel(order: &Order, caller: &UserId) -> Result<(), OrderError> {
    if &order.user_id != caller {
        return Err(OrderError::Forbidden);
    }
    if !matches!(
        order.delivery_status,
        DeliveryStatus::Pending | DeliveryStatus::Active
    ) {
        return Err(OrderError::NotCancellable(order.delivery_status));
    }
    Ok(())
}

/// Only the vendor who sold the product may move the delivery status.
///
/// # Errors
///
/// Returns [`OrderError::Forbidden`] or [`OrderError::InvalidTransition`].
pub fn authorize_status_change(
    order: &Order,
    caller: &UserId,
    next: DeliveryStatus,
) -> Result<DeliveryStatus, OrderError> {
    if &order.vendor_id != caller {
        return Err(OrderError::Forbidden);
    }
    Ok(order.delivery_status.transition_to(next)?)
}

/// The buyer and the vendor can see an order; nobody else.
///
/// # Errors
///
/// Returns [`OrderError::Forbidden`] for anyone else.
pub fn authorize_view(order: &Order, caller: &UserId) -> Result<(), OrderError> {
    if &order.user_id == caller || &order.vendor_id == caller {
        Ok(())
    } else {
        Err(OrderError::Forbidden)
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// Turn the buyer's cart into orders.
///
/// An empty cart succeeds with no orders.
///
/// # Errors
///
/// Returns [`OrderError::ProductUnavailable`] if any line's product is gone,
/// leaving the cart untouched.
#[instrument(skip(pool, address), fields(user_id = %user_id))]
pub async fn place(
    pool: &PgPool,
    user_id: &UserId,
    address: &str,
    payment_method: PaymentMethod,
) -> Result<Vec<Order>, OrderError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(OrderError::MissingAddress);
    }

    // Any early return drops `tx`, which rolls it back.
    let mut tx = pool.begin().await?;

    let lines = OrderRepository::lock_cart(&mut tx, user_id).await?;
    if lines.is_empty() {
        tx.rollback().await?;
        return Ok(Vec::new());
    }

    let drafts = plan_orders(&lines)?;
    let orders =
        OrderRepository::insert_drafts(&mut tx, user_id, address, payment_method, &drafts).await?;

    let consumed: Vec<_> = drafts.iter().map(|d| d.cart_line_id).collect();
    OrderRepository::delete_cart_lines(&mut tx, &consumed).await?;
    OrderRepository::notify_vendors(&mut tx, &vendor_notifications(&drafts)).await?;

    tx.commit().await?;

    info!(orders = orders.len(), "Orders placed");
    Ok(orders)
}

/// Cancel an order on the buyer's behalf.
///
/// # Errors
///
/// Returns [`OrderError::NotFound`], [`OrderError::Forbidden`] or
/// [`OrderError::NotCancellable`].
#[instrument(skip(pool), fields(order_id = %order_id, caller = %caller))]
pub async fn cancel(pool: &PgPool, order_id: OrderId, caller: &UserId) -> Result<Order, OrderError> {
    let mut tx = pool.begin().await?;

    let order = OrderRepository::lock(&mut tx, order_id)
        .await?
        .ok_or(OrderError::NotFound)?;
    authorize_cancel(&order, caller)?;

    let order = OrderRepository::set_status(&mut tx, order_id, DeliveryStatus::Cancelled).await?;
    tx.commit().await?;

    info!("Order cancelled");
    Ok(order)
}

/// Move an order's delivery status on the vendor's behalf.
///
/// # Errors
///
/// Returns [`OrderError::NotFound`], [`OrderError::Forbidden`] or
/// [`OrderError::InvalidTransition`].
#[instrument(skip(pool), fields(order_id = %order_id, caller = %caller, next = %next))]
pub async fn update_status(
    pool: &PgPool,
    order_id: OrderId,
    caller: &UserId,
    next: DeliveryStatus,
) -> Result<Order, OrderError> {
    let mut tx = pool.begin().await?;

    let order = OrderRepository::lock(&mut tx, order_id)
        .await?
        .ok_or(OrderError::NotFound)?;
    let next = authorize_status_change(&order, caller, next)?;

    let order = OrderRepository::set_status(&mut tx, order_id, next).await?;
    tx.commit().await?;

    info!("Order status updated");
    Ok(order)
}

/// Fetch an order for its buyer or vendor.
///
/// # Errors
///
/// Returns [`OrderError::NotFound`] or [`OrderError::Forbidden`].
pub async fn view(
    pool: &PgPool,
    order_id: OrderId,
    caller: &UserId,
) -> Result<OrderDetail, OrderError> {
    let detail = OrderRepository::new(pool)
        .get_detail(order_id)
        .await?
        .ok_or(OrderError::NotFound)?;
    authorize_view(&detail.order, caller)?;
    Ok(detail)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use lasu_mart_core::{CartLineId, Price};

    use super::*;

    fn line(vendor: Option<&str>) -> CartLineSnapshot {
        CartLineSnapshot {
            cart_line_id: CartLineId::random(),
            product_id: ProductId::random(),
            variant: Some("red".to_string()),
            quantity: 2,
            product_name: vendor.map(|_| "Desk lamp".to_string()),
            unit_price: vendor.map(|_| "4500".parse::<Price>().unwrap()),
            vendor_id: vendor.map(UserId::new),
        }
    }

    fn order(buyer: &str, vendor: &str, status: DeliveryStatus) -> Order {
        Order {
            order_id: OrderId::random(),
            product_id: Some(ProductId::random()),
            product_name: "Desk lamp".to_string(),
            unit_price: Price::ZERO,
            variant: None,
            vendor_id: UserId::new(vendor),
            quantity_ordered: 1,
            user_id: UserId::new(buyer),
            address: "Hall 3, LASU".to_string(),
            payment_method: PaymentMethod::OnDelivery,
            delivery_status: status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_orders_snapshots_each_line() {
        let lines = vec![line(Some("vendor-a")), line(Some("vendor-b"))];
        let drafts = plan_orders(&lines).unwrap();

        assert_eq!(drafts.len(), 2);
        for (draft, line) in drafts.iter().zip(&lines) {
            assert_eq!(draft.cart_line_id, line.cart_line_id);
            assert_eq!(draft.product_id, line.product_id);
            assert_eq!(draft.quantity, 2);
            assert_eq!(draft.variant.as_deref(), Some("red"));
            assert_eq!(Some(&draft.vendor_id), line.vendor_id.as_ref());
        }
    }

    #[test]
    fn test_plan_orders_rejects_missing_product() {
        let gone = line(None);
        let gone_id = gone.product_id;
        let lines = vec![line(Some("vendor-a")), gone];

        assert!(matches!(
            plan_orders(&lines),
            Err(OrderError::ProductUnavailable(id)) if id == gone_id
        ));
    }

    #[test]
    fn test_plan_orders_empty_cart() {
        assert!(plan_orders(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_one_notification_per_vendor() {
        let drafts = plan_orders(&[
            line(Some("vendor-a")),
            line(Some("vendor-b")),
            line(Some("vendor-a")),
        ])
        .unwrap();

        let notes = vendor_notifications(&drafts);
        assert_eq!(
            notes,
            vec![
                (UserId::new("vendor-a"), "You have 2 new orders".to_string()),
                (UserId::new("vendor-b"), "You have a new order".to_string()),
            ]
        );
    }

    #[test]
    fn test_only_buyer_can_cancel() {
        let order = order("buyer", "vendor", DeliveryStatus::Pending);
        assert!(authorize_cancel(&order, &UserId::new("buyer")).is_ok());
        assert!(matches!(
            authorize_cancel(&order, &UserId::new("vendor")),
            Err(OrderError::Forbidden)
        ));
        assert!(matches!(
            authorize_cancel(&order, &UserId::new("stranger")),
            Err(OrderError::Forbidden)
        ));
    }

    #[test]
    fn test_closed_orders_cannot_be_cancelled() {
        for status in [DeliveryStatus::Delivered, DeliveryStatus::Cancelled] {
            let order = order("buyer", "vendor", status);
            assert!(matches!(
                authorize_cancel(&order, &UserId::new("buyer")),
                Err(OrderError::NotCancellable(s)) if s == status
            ));
        }
        let active = order("buyer", "vendor", DeliveryStatus::Active);
        assert!(authorize_cancel(&active, &UserId::new("buyer")).is_ok());
    }

    #[test]
    fn test_only_vendor_can_move_status() {
        let order = order("buyer", "vendor", DeliveryStatus::Pending);
        assert_eq!(
            authorize_status_change(&order, &UserId::new("vendor"), DeliveryStatus::Active)
                .unwrap(),
            DeliveryStatus::Active
        );
        assert!(matches!(
            authorize_status_change(&order, &UserId::new("buyer"), DeliveryStatus::Delivered),
            Err(OrderError::Forbidden)
        ));
    }

    #[test]
    fn test_terminal_status_is_final() {
        let order = order("buyer", "vendor", DeliveryStatus::Delivered);
        assert!(matches!(
            authorize_status_change(&order, &UserId::new("vendor"), DeliveryStatus::Pending),
            Err(OrderError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_view_limited_to_parties() {
        let order = order("buyer", "vendor", DeliveryStatus::Pending);
        assert!(authorize_view(&order, &UserId::new("buyer")).is_ok());
        assert!(authorize_view(&order, &UserId::new("vendor")).is_ok());
        assert!(matches!(
            authorize_view(&order, &UserId::new("stranger")),
            Err(OrderError::Forbidden)
        ));
    }
}
