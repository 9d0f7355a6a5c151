//! Order models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lasu_mart_core::{
    CartLineId, DeliveryStatus, Email, OrderId, PaymentMethod, PhoneNumber, Price, ProductId,
    UserId,
};

/// An order row. Product fields are a snapshot taken at placement.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub order_id: OrderId,
    /// `None` once the product has been deleted.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub unit_price: Price,
    pub variant: Option<String>,
    pub vendor_id: UserId,
    pub quantity_ordered: i32,
    pub user_id: UserId,
    pub address: String,
    pub payment_method: PaymentMethod,
    pub delivery_status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order with a thumbnail, for history and vendor lists.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub image_url: Option<String>,
}

/// A single order with the buyer's contact details for the vendor.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub buyer_name: String,
    pub buyer_email: Email,
    pub buyer_phone: PhoneNumber,
    pub image_url: Option<String>,
}

/// One order to insert, derived from one cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub cart_line_id: CartLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Price,
    pub variant: Option<String>,
    pub vendor_id: UserId,
    pub quantity: i32,
}

/// Whitelisted order sort columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSort {
    #[default]
    #[serde(alias = "date_added")]
    CreatedAt,
    Price,
}

impl OrderSort {
    /// SQL expression for this column (the orders table is aliased `o`).
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::CreatedAt => "o.created_at",
            Self::Price => "(o.unit_price * o.quantity_ordered)",
        }
    }
}
