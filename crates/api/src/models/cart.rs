//! Cart models.

use serde::{Deserialize, Serialize};

use lasu_mart_core::{CartLineId, Price, ProductId, UserId};

/// A cart line joined with its product for display.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub cart_line_id: CartLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Price,
    pub variant: Option<String>,
    pub quantity: i32,
    pub image_url: Option<String>,
}

/// A locked cart line with whatever is left of its product.
///
/// Product columns are `None` when the product row no longer exists.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartLineSnapshot {
    pub cart_line_id: CartLineId,
    pub product_id: ProductId,
    pub variant: Option<String>,
    pub quantity: i32,
    pub product_name: Option<String>,
    pub unit_price: Option<Price>,
    pub vendor_id: Option<UserId>,
}

/// Upper bound on one cart line's quantity. Repeated adds stop here.
pub const MAX_LINE_QUANTITY: i32 = 999;

/// `POST /user/cart` body. Quantities accumulate on repeated adds.
#[derive(Debug, Clone, Deserialize)]
pub struct AddToCart {
    pub product_id: ProductId,
    pub variant: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

impl AddToCart {
    /// The requested quantity, if it is within `1..=MAX_LINE_QUANTITY`.
    #[must_use]
    pub fn checked_quantity(&self) -> Option<i32> {
        i32::try_from(self.quantity)
            .ok()
            .filter(|q| (1..=MAX_LINE_QUANTITY).contains(q))
    }
}

/// `DELETE /user/cart` query.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveFromCart {
    pub product_id: ProductId,
    pub variant: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn add(quantity: u32) -> AddToCart {
        AddToCart {
            product_id: ProductId::random(),
            variant: None,
            quantity,
        }
    }

    #[test]
    fn test_checked_quantity_bounds() {
        assert_eq!(add(1).checked_quantity(), Some(1));
        assert_eq!(add(999).checked_quantity(), Some(MAX_LINE_QUANTITY));
        assert_eq!(add(0).checked_quantity(), None);
        assert_eq!(add(1_000).checked_quantity(), None);
        assert_eq!(add(u32::MAX).checked_quantity(), None);
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        let body: AddToCart = serde_json::from_str(&format!(
            r#"{{"product_id":"{}"}}"#,
            ProductId::random()
        ))
        .unwrap();
        assert_eq!(body.checked_quantity(), Some(1));
    }
}
