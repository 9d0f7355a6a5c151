//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneNumberError {
    #[error("phone number cannot be empty")]
    Empty,
    #[error("phone number may only contain digits after the country code")]
    InvalidCharacter,
    #[error("phone number must have between {min} and {max} digits")]
    InvalidLength { min: usize, max: usize },
    #[error("country code must look like +234")]
    InvalidCountryCode,
}

/// A phone number in international (`+<digits>`) form.
///
/// Users register with a local number; [`PhoneNumber::with_country_code`]
/// prepends the configured dialing prefix. Spaces, dashes and parentheses
/// are ignored on input.
///
/// ```
/// use lasu_mart_core::PhoneNumber;
///
/// let local = PhoneNumber::with_country_code("0803 123 4567", "+234").unwrap();
/// assert_eq!(local.as_str(), "+2348031234567");
///
/// let intl = PhoneNumber::with_country_code("+447700900123", "+234").unwrap();
/// assert_eq!(intl.as_str(), "+447700900123");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Minimum digits in a full international number.
    pub const MIN_DIGITS: usize = 7;
    /// Maximum digits allowed by E.164.
    pub const MAX_DIGITS: usize = 15;

    /// Parse a number that already carries its `+` country prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the number is empty, contains non-digits, or has
    /// an implausible number of digits.
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        let cleaned = strip_formatting(s);
        let digits = cleaned
            .strip_prefix('+')
            .ok_or(PhoneNumberError::InvalidCountryCode)?;
        Self::from_digits(digits)
    }

    /// Build a full number from user input, prepending `country_code` unless
    /// the input is already international. A single trunk `0` is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the country code is malformed or the resulting
    /// number fails [`PhoneNumber::parse`] rules.
    pub fn with_country_code(input: &str, country_code: &str) -> Result<Self, PhoneNumberError> {
        let cleaned = strip_formatting(input);
        if cleaned.is_empty() {
            return Err(PhoneNumberError::Empty);
        }
        if let Some(digits) = cleaned.strip_prefix('+') {
            return Self::from_digits(digits);
        }

        let prefix = country_code
            .strip_prefix('+')
            .filter(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
            .ok_or(PhoneNumberError::InvalidCountryCode)?;
        let national = cleaned.strip_prefix('0').unwrap_or(&cleaned);

        Self::from_digits(&format!("{prefix}{national}"))
    }

    fn from_digits(digits: &str) -> Result<Self, PhoneNumberError> {
        if digits.is_empty() {
            return Err(PhoneNumberError::Empty);
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneNumberError::InvalidCharacter);
        }
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(PhoneNumberError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }
        Ok(Self(format!("+{digits}")))
    }

    /// Returns the number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the number and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

fn strip_formatting(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect()
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for PhoneNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PhoneNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for PhoneNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_prepends_country_code() {
        let phone = PhoneNumber::with_country_code("8031234567", "+234").unwrap();
        assert_eq!(phone.as_str(), "+2348031234567");
    }

    #[test]
    fn test_drops_trunk_zero() {
        let phone = PhoneNumber::with_country_code("08031234567", "+234").unwrap();
        assert_eq!(phone.as_str(), "+2348031234567");
    }

    #[test]
    fn test_keeps_international_input() {
        let phone = PhoneNumber::with_country_code("+1 (415) 555-0100", "+234").unwrap();
        assert_eq!(phone.as_str(), "+14155550100");
    }

    #[test]
    fn test_rejects_letters() {
        assert_eq!(
            PhoneNumber::with_country_code("0803abc4567", "+234"),
            Err(PhoneNumberError::InvalidCharacter)
        );
    }

    #[test]
    fn test_rejects_bad_country_code() {
        assert_eq!(
            PhoneNumber::with_country_code("8031234567", "234"),
            Err(PhoneNumberError::InvalidCountryCode)
        );
    }

    #[test]
    fn test_rejects_too_short() {
        assert!(matches!(
            PhoneNumber::parse("+1234"),
            Err(PhoneNumberError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_parse_requires_plus() {
        assert_eq!(
            PhoneNumber::parse("2348031234567"),
            Err(PhoneNumberError::InvalidCountryCode)
        );
        assert!(PhoneNumber::parse("+2348031234567").is_ok());
    }

    #[test]
    fn test_empty() {
        assert_eq!(
            PhoneNumber::with_country_code(" - ", "+234"),
            Err(PhoneNumberError::Empty)
        );
    }
}
