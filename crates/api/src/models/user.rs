//! User profile models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lasu_mart_core::{Email, PaymentMethod, PhoneNumber, Role, UserId};

/// A user's profile as returned by `GET /user`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub user_id: UserId,
    pub email: Email,
    pub display_name: String,
    pub phone_number: PhoneNumber,
    pub picture_url: Option<String>,
    #[serde(skip)]
    pub picture_public_id: Option<String>,
    pub role: Role,
    pub address: Option<String>,
    pub preferred_payment_method: PaymentMethod,
    pub total_cart_items: i64,
    pub created_at: DateTime<Utc>,
}

/// Profile row created right after the identity provider account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub uid: UserId,
    pub email: Email,
    pub display_name: String,
    pub phone_number: PhoneNumber,
    pub role: Role,
}

/// Editable profile fields; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub address: Option<String>,
    pub preferred_payment_method: Option<PaymentMethod>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.address.is_none()
            && self.preferred_payment_method.is_none()
    }
}
