//! Identity provider errors and their user-facing translations.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider refused the request with one of its error codes.
    #[error("identity provider rejected request: {code} ({message})")]
    Rejected { code: String, message: String },

    /// The ID token is malformed, expired or revoked.
    #[error("invalid or expired ID token")]
    InvalidToken,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status without a parseable error body.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Provider error codes the API explains to clients.
const KNOWN_CODES: &[(&str, StatusCode, &str)] = &[
    (
        "auth/email-already-exists",
        StatusCode::BAD_REQUEST,
        "An account with this email already exists",
    ),
    (
        "auth/phone-number-already-exists",
        StatusCode::BAD_REQUEST,
        "An account with this phone number already exists",
    ),
    (
        "auth/invalid-email",
        StatusCode::BAD_REQUEST,
        "Invalid email address",
    ),
    (
        "auth/invalid-phone-number",
        StatusCode::BAD_REQUEST,
        "Invalid phone number",
    ),
    (
        "auth/invalid-password",
        StatusCode::BAD_REQUEST,
        "Password must be at least 6 characters",
    ),
    (
        "auth/weak-password",
        StatusCode::BAD_REQUEST,
        "Password is too weak",
    ),
    (
        "auth/invalid-display-name",
        StatusCode::BAD_REQUEST,
        "Display name must be a non-empty string",
    ),
    ("auth/user-not-found", StatusCode::NOT_FOUND, "User not found"),
    (
        "auth/id-token-expired",
        StatusCode::UNAUTHORIZED,
        "Session expired, please log in again",
    ),
    (
        "auth/id-token-revoked",
        StatusCode::UNAUTHORIZED,
        "Session revoked, please log in again",
    ),
    (
        "auth/too-many-requests",
        StatusCode::TOO_MANY_REQUESTS,
        "Too many attempts, try again later",
    ),
];

/// Look up the status and message for a provider error code.
#[must_use]
pub fn lookup(code: &str) -> Option<(StatusCode, &'static str)> {
    KNOWN_CODES
        .iter()
        .find(|(known, _, _)| *known == code)
        .map(|(_, status, message)| (*status, *message))
}

impl IdentityError {
    /// Status and message to show the client, when this is a failure the
    /// client can act on.
    #[must_use]
    pub fn client_facing(&self) -> Option<(StatusCode, &'static str)> {
        match self {
            Self::Rejected { code, .. } => lookup(code),
            Self::InvalidToken => Some((StatusCode::UNAUTHORIZED, "Invalid or expired token")),
            Self::Http(_) | Self::Api { .. } | Self::Parse(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(
            lookup("auth/email-already-exists"),
            Some((
                StatusCode::BAD_REQUEST,
                "An account with this email already exists"
            ))
        );
        assert_eq!(
            lookup("auth/user-not-found").map(|(s, _)| s),
            Some(StatusCode::NOT_FOUND)
        );
        assert_eq!(
            lookup("auth/weak-password").map(|(s, _)| s),
            Some(StatusCode::BAD_REQUEST)
        );
    }

    #[test]
    fn test_unknown_code_is_not_client_facing() {
        let err = IdentityError::Rejected {
            code: "auth/internal-error".to_string(),
            message: "boom".to_string(),
        };
        assert!(err.client_facing().is_none());
    }

    #[test]
    fn test_invalid_token_is_unauthorized() {
        assert_eq!(
            IdentityError::InvalidToken.client_facing().map(|(s, _)| s),
            Some(StatusCode::UNAUTHORIZED)
        );
    }
}
