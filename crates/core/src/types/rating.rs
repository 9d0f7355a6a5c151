//! Review rating.

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between {min} and {max}, got {got}", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    got: i32,
}

/// A star rating from 1 to 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Rating(i16);

impl Rating {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    /// # Errors
    ///
    /// Returns [`RatingError`] when the value is outside `1..=5`.
    pub fn new(value: i32) -> Result<Self, RatingError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            i16::try_from(value)
                .map(Self)
                .map_err(|_| RatingError { got: value })
        } else {
            Err(RatingError { got: value })
        }
    }

    #[must_use]
    pub const fn get(self) -> i16 {
        self.0
    }
}

impl TryFrom<i32> for Rating {
    type Error = RatingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i32 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Rating {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Rating {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(i32::from(raw))?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Rating {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(1).is_ok());
        assert!(Rating::new(5).is_ok());
        assert!(Rating::new(6).is_err());
    }

    #[test]
    fn test_deserialize_out_of_range() {
        assert!(serde_json::from_str::<Rating>("9").is_err());
        assert_eq!(serde_json::from_str::<Rating>("4").ok().map(Rating::get), Some(4));
    }
}
