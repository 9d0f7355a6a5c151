//! Type-safe price representation using decimal arithmetic.
//!
//! The marketplace trades in a single currency (naira), so a price is just a
//! non-negative amount with at most two decimal places.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("price cannot be negative")]
    Negative,
    #[error("price is not a valid decimal number")]
    Invalid,
}

/// A non-negative amount, rounded to two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount.round_dp(2)))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price multiplied by a quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::Invalid)?;
        Self::new(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert_eq!(Price::new(Decimal::new(-1, 0)), Err(PriceError::Negative));
    }

    #[test]
    fn test_zero_is_valid() {
        assert_eq!(Price::new(Decimal::ZERO).unwrap(), Price::ZERO);
    }

    #[test]
    fn test_rounds_to_two_places() {
        let price: Price = "1500.456".parse().unwrap();
        assert_eq!(price.amount(), Decimal::new(150_046, 2));
        assert_eq!(price.to_string(), "1500.46");
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!("ten naira".parse::<Price>(), Err(PriceError::Invalid));
    }

    #[test]
    fn test_times_quantity() {
        let price: Price = "250.50".parse().unwrap();
        assert_eq!(price.times(3), Decimal::new(75_150, 2));
    }

    #[test]
    fn test_deserialize_rejects_negative_string() {
        assert!(serde_json::from_str::<Price>("\"-5.00\"").is_err());
        let ok: Price = serde_json::from_str("\"5.00\"").unwrap();
        assert_eq!(ok.to_string(), "5.00");
    }
}
