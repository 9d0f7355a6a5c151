//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use lasu_mart_core::{Email, OtpKind, PhoneNumber, Role, UserId};

/// Which contact channels the user has proven ownership of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verified {
    pub email: bool,
    pub phone: bool,
}

impl Verified {
    /// Both channels verified; required before listing products.
    #[must_use]
    pub const fn can_sell(self) -> bool {
        self.email && self.phone
    }

    /// Copy with the channel for `kind` marked verified.
    #[must_use]
    pub const fn with(self, kind: OtpKind) -> Self {
        match kind {
            OtpKind::Email => Self {
                email: true,
                phone: self.phone,
            },
            OtpKind::Phone => Self {
                email: self.email,
                phone: true,
            },
        }
    }
}

/// Session-stored user identity.
///
/// Built from the identity provider's verified token and claims at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub uid: UserId,
    pub email: Email,
    pub phone_number: PhoneNumber,
    pub display_name: String,
    pub role: Role,
    pub verified: Verified,
}

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The contact address an OTP of `kind` must have been sent to.
    #[must_use]
    pub fn contact_for(&self, kind: OtpKind) -> &str {
        match kind {
            OtpKind::Email => self.email.as_str(),
            OtpKind::Phone => self.phone_number.as_str(),
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verified_with_keeps_other_channel() {
        let v = Verified::default().with(OtpKind::Email);
        assert_eq!(v, Verified { email: true, phone: false });
        assert!(!v.can_sell());
        assert!(v.with(OtpKind::Phone).can_sell());
    }

    #[test]
    fn test_contact_for() {
        let user = CurrentUser {
            uid: UserId::new("u1"),
            email: Email::parse("buyer@lasu.edu.ng").unwrap(),
            phone_number: PhoneNumber::parse("+2348031234567").unwrap(),
            display_name: "Buyer".to_string(),
            role: Role::User,
            verified: Verified::default(),
        };
        assert_eq!(user.contact_for(OtpKind::Email), "buyer@lasu.edu.ng");
        assert_eq!(user.contact_for(OtpKind::Phone), "+2348031234567");
    }
}
