//! Status and role enums for marketplace entities.
//!
//! Each enum maps to a PostgreSQL enum type of the same snake_case name
//! when the `postgres` feature is enabled.

use serde::{Deserialize, Serialize};

/// Delivery lifecycle of an order.
///
/// `pending -> active -> delivered`, with `cancelled` reachable from the two
/// open states. `delivered` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "delivery_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    /// On its way to the buyer.
    #[serde(alias = "delivering")]
    Active,
    Delivered,
    Cancelled,
}

/// Why a delivery status change was refused.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransitionError {
    #[error("order is already {0} and can no longer change")]
    Terminal(DeliveryStatus),
}

impl DeliveryStatus {
    pub const ALL: [Self; 4] = [Self::Pending, Self::Active, Self::Delivered, Self::Cancelled];

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Move to `next`, refusing any change out of a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`StatusTransitionError::Terminal`] when `self` is terminal.
    pub const fn transition_to(self, next: Self) -> Result<Self, StatusTransitionError> {
        if self.is_terminal() {
            return Err(StatusTransitionError::Terminal(self));
        }
        Ok(next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" | "delivering" => Ok(Self::Active),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid delivery status: {s}")),
        }
    }
}

/// Marketplace role carried in identity-provider claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Buyer and, once verified, vendor.
    #[default]
    User,
    /// Manages categories and can moderate reviews.
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// How a buyer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    NotSet,
    Paystack,
    OnDelivery,
}

impl PaymentMethod {
    /// The method to record on an order: the explicit choice, else the
    /// buyer's preference, else payment on delivery.
    #[must_use]
    pub fn resolve(requested: Option<Self>, preferred: Self) -> Self {
        match requested.filter(|m| *m != Self::NotSet) {
            Some(method) => method,
            None if preferred != Self::NotSet => preferred,
            None => Self::OnDelivery,
        }
    }
}

/// Channel an OTP was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "otp_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OtpKind {
    Email,
    #[serde(alias = "phone_number")]
    Phone,
}

impl std::fmt::Display for OtpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Phone => write!(f, "phone"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_delivering_alias() {
        let status: DeliveryStatus = serde_json::from_str("\"delivering\"").unwrap();
        assert_eq!(status, DeliveryStatus::Active);
        assert_eq!("delivering".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::Active);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"active\"");
    }

    #[test]
    fn test_terminal_states_refuse_transitions() {
        assert_eq!(
            DeliveryStatus::Delivered.transition_to(DeliveryStatus::Pending),
            Err(StatusTransitionError::Terminal(DeliveryStatus::Delivered))
        );
        assert!(
            DeliveryStatus::Cancelled
                .transition_to(DeliveryStatus::Active)
                .is_err()
        );
    }

    #[test]
    fn test_open_states_transition() {
        assert_eq!(
            DeliveryStatus::Pending.transition_to(DeliveryStatus::Active),
            Ok(DeliveryStatus::Active)
        );
        assert_eq!(
            DeliveryStatus::Active.transition_to(DeliveryStatus::Delivered),
            Ok(DeliveryStatus::Delivered)
        );
    }

    #[test]
    fn test_payment_method_resolution() {
        use PaymentMethod::{NotSet, OnDelivery, Paystack};
        assert_eq!(PaymentMethod::resolve(Some(Paystack), OnDelivery), Paystack);
        assert_eq!(PaymentMethod::resolve(None, Paystack), Paystack);
        assert_eq!(PaymentMethod::resolve(Some(NotSet), Paystack), Paystack);
        assert_eq!(PaymentMethod::resolve(None, NotSet), OnDelivery);
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("vendor".parse::<Role>().is_err());
    }
}
