//! One-time verification code records.

use chrono::{DateTime, Utc};
use thiserror::Error;

use lasu_mart_core::{OtpId, OtpKind};

use super::CurrentUser;

/// A stored one-time code.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpRecord {
    pub otp_id: OtpId,
    pub otp_kind: OtpKind,
    pub code: String,
    pub receiver: String,
    pub expires_at: DateTime<Utc>,
}

/// Why a submitted code was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OtpRejection {
    #[error("invalid verification code")]
    Invalid,
    #[error("verification code has expired")]
    Expired,
    #[error("verification code was not issued to this account")]
    RecipientMismatch,
}

impl OtpRecord {
    /// Check the code against the clock and the caller's contact details.
    ///
    /// A code is dead from `expires_at` onwards.
    ///
    /// # Errors
    ///
    /// Returns [`OtpRejection::Expired`] once `now >= expires_at`, or
    /// [`OtpRejection::RecipientMismatch`] when the code was sent to a
    /// different address than the caller's current one.
    pub fn verify(&self, now: DateTime<Utc>, user: &CurrentUser) -> Result<OtpKind, OtpRejection> {
        if self.expires_at <= now {
            return Err(OtpRejection::Expired);
        }
        if self.receiver != user.contact_for(self.otp_kind) {
            return Err(OtpRejection::RecipientMismatch);
        }
        Ok(self.otp_kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use lasu_mart_core::{Email, PhoneNumber, Role, UserId};

    use super::*;
    use crate::models::Verified;

    fn user() -> CurrentUser {
        CurrentUser {
            uid: UserId::new("uid-1"),
            email: Email::parse("ada@lasu.edu.ng").unwrap(),
            phone_number: PhoneNumber::parse("+2348031234567").unwrap(),
            display_name: "Ada".to_string(),
            role: Role::User,
            verified: Verified::default(),
        }
    }

    fn record(kind: OtpKind, receiver: &str, expires_at: DateTime<Utc>) -> OtpRecord {
        OtpRecord {
            otp_id: OtpId::random(),
            otp_kind: kind,
            code: "123456".to_string(),
            receiver: receiver.to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_valid_code() {
        let now = Utc::now();
        let otp = record(OtpKind::Email, "ada@lasu.edu.ng", now + Duration::minutes(5));
        assert_eq!(otp.verify(now, &user()), Ok(OtpKind::Email));
    }

    #[test]
    fn test_expired_at_boundary() {
        let now = Utc::now();
        let otp = record(OtpKind::Email, "ada@lasu.edu.ng", now);
        assert_eq!(otp.verify(now, &user()), Err(OtpRejection::Expired));
    }

    #[test]
    fn test_expired_in_past() {
        let now = Utc::now();
        let otp = record(OtpKind::Phone, "+2348031234567", now - Duration::seconds(1));
        assert_eq!(otp.verify(now, &user()), Err(OtpRejection::Expired));
    }

    #[test]
    fn test_recipient_mismatch() {
        let now = Utc::now();
        let otp = record(OtpKind::Phone, "+2348000000000", now + Duration::minutes(5));
        assert_eq!(otp.verify(now, &user()), Err(OtpRejection::RecipientMismatch));
    }

    #[test]
    fn test_kind_selects_contact_field() {
        let now = Utc::now();
        // An email code sent to the phone number does not count.
        let otp = record(OtpKind::Email, "+2348031234567", now + Duration::minutes(5));
        assert_eq!(otp.verify(now, &user()), Err(OtpRejection::RecipientMismatch));
    }
}
