//! Identity provider integration.
//!
//! Accounts, passwords and ID tokens live with an external identity
//! provider; this service only keeps a profile row per uid. The provider is
//! reached through [`IdentityProvider`] so handlers and tests never depend on
//! a concrete client.

pub mod error;
pub mod http;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use lasu_mart_core::{Email, PhoneNumber, Role, UserId};

use crate::models::Verified;

pub use error::IdentityError;
pub use http::HttpIdentityProvider;

/// Custom claims attached to every account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub role: Role,
    #[serde(default, alias = "isVerified")]
    pub verified: Verified,
}

/// Account details sent on registration.
#[derive(Debug)]
pub struct NewIdentity {
    pub email: Email,
    pub password: SecretString,
    pub display_name: String,
    pub phone_number: PhoneNumber,
}

/// An account as stored by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityRecord {
    pub uid: UserId,
    pub email: Email,
    pub display_name: String,
    pub phone_number: PhoneNumber,
}

/// The result of verifying an ID token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifiedToken {
    pub uid: UserId,
    #[serde(default)]
    pub claims: Claims,
}

/// Operations the marketplace needs from the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account.
    async fn create_user(&self, user: &NewIdentity) -> Result<IdentityRecord, IdentityError>;

    /// Delete an account. Used to undo a registration whose profile row
    /// could not be written.
    async fn delete_user(&self, uid: &UserId) -> Result<(), IdentityError>;

    /// Verify an ID token issued by the provider.
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedToken, IdentityError>;

    /// Read an account's custom claims.
    async fn get_claims(&self, uid: &UserId) -> Result<Claims, IdentityError>;

    /// Replace an account's custom claims.
    async fn set_claims(&self, uid: &UserId, claims: &Claims) -> Result<(), IdentityError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_default_to_unverified_user() {
        let claims: Claims = serde_json::from_str("{}").unwrap();
        assert_eq!(claims.role, Role::User);
        assert!(!claims.verified.can_sell());
    }

    #[test]
    fn test_claims_accept_legacy_verified_key() {
        let claims: Claims = serde_json::from_str(
            r#"{"role":"admin","isVerified":{"email":true,"phone":false}}"#,
        )
        .unwrap();
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.verified.email);
        assert!(!claims.verified.phone);
    }
}
