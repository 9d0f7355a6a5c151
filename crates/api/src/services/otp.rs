//! One-time verification codes for email and phone ownership.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info, instrument};

use lasu_mart_core::OtpKind;

use crate::db::{OtpRepository, RepositoryError};
use crate::models::{CurrentUser, OtpRejection};
use crate::services::email::{EmailError, EmailService};
use crate::services::identity::{IdentityError, IdentityProvider};

/// Errors from issuing or checking a code.
#[derive(Debug, Error)]
pub enum OtpError {
    #[error(transparent)]
    Rejected(#[from] OtpRejection),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Email(#[from] EmailError),
}

/// A random six-digit code.
#[must_use]
pub fn generate_code() -> String {
    rand::rng().random_range(100_000..1_000_000).to_string()
}

/// Issue a fresh code of `kind` to the user's contact address.
///
/// Email codes go out over SMTP when a mailer is configured. Phone codes have
/// no delivery channel yet and are only logged.
///
/// # Errors
///
/// Returns an error if the code cannot be stored or the email fails.
#[instrument(skip(pool, mailer, user), fields(user_id = %user.uid, kind = ?kind))]
pub async fn send(
    pool: &PgPool,
    mailer: Option<&EmailService>,
    user: &CurrentUser,
    kind: OtpKind,
    ttl: Duration,
) -> Result<(), OtpError> {
    let receiver = user.contact_for(kind);
    let code = generate_code();
    let expires_at = Utc::now()
        + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(5));

    OtpRepository::new(pool)
        .replace(kind, receiver, &code, expires_at)
        .await?;

    match (kind, mailer) {
        (OtpKind::Email, Some(mailer)) => {
            mailer
                .send_otp_code(receiver, &code, ttl.as_secs().div_ceil(60))
                .await?;
        }
        _ => debug!(receiver = %receiver, code = %code, "OTP issued without a delivery channel"),
    }

    info!("OTP issued");
    Ok(())
}

/// Check a submitted code and mark the matching channel verified.
///
/// Returns the caller with refreshed claims, ready to be written back to the
/// session.
///
/// # Errors
///
/// Returns [`OtpError::Rejected`] for unknown, expired or misdirected codes.
#[instrument(skip(pool, identity, user, code), fields(user_id = %user.uid))]
pub async fn verify(
    pool: &PgPool,
    identity: &dyn IdentityProvider,
    user: &CurrentUser,
    code: &str,
) -> Result<CurrentUser, OtpError> {
    let repo = OtpRepository::new(pool);
    let code = code.trim();
    let contacts = [user.email.as_str(), user.phone_number.as_str()];

    // Codes are not unique across users; prefer the caller's own.
    let record = match repo.find_for(code, &contacts).await? {
        Some(record) => record,
        None => repo.find(code).await?.ok_or(OtpRejection::Invalid)?,
    };
    let kind = record.verify(Utc::now(), user)?;

    let mut claims = identity.get_claims(&user.uid).await?;
    claims.verified = claims.verified.with(kind);
    identity.set_claims(&user.uid, &claims).await?;

    repo.delete_for(&contacts).await?;

    info!(kind = ?kind, "Contact verified");
    Ok(CurrentUser {
        role: claims.role,
        verified: claims.verified,
        ..user.clone()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }
}
