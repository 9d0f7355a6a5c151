//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before responding; clients only ever see
//! `{"message": "..."}` with a status code, never internal details.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::OtpRejection;
use crate::services::assets::AssetError;
use crate::services::email::EmailError;
use crate::services::embeddings::EmbeddingError;
use crate::services::identity::IdentityError;
use crate::services::orders::OrderError;
use crate::services::otp::OtpError;
use crate::services::products::ProductError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Identity provider operation failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Asset host operation failed.
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Embedding service call failed.
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Verification error: {0}")]
    Otp(#[from] OtpError),

    #[error("Product error: {0}")]
    Product(#[from] ProductError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(RepositoryError::Database(e))
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(e: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session: {e}"))
    }
}

const INTERNAL: &str = "Internal server error";
const UPSTREAM: &str = "External service error";

fn repository(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
        }
    }
}

fn identity(err: &IdentityError) -> (StatusCode, String) {
    err.client_facing().map_or_else(
        || (StatusCode::BAD_GATEWAY, UPSTREAM.to_string()),
        |(status, message)| (status, message.to_string()),
    )
}

fn upstream() -> (StatusCode, String) {
    (StatusCode::BAD_GATEWAY, UPSTREAM.to_string())
}

fn rejection(err: OtpRejection) -> (StatusCode, String) {
    let status = match err {
        OtpRejection::Invalid | OtpRejection::Expired => StatusCode::BAD_REQUEST,
        OtpRejection::RecipientMismatch => StatusCode::FORBIDDEN,
    };
    (status, err.to_string())
}

impl AppError {
    /// Status and client-safe message.
    fn parts(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository(err),
            Self::Identity(err) => identity(err),
            Self::Asset(_) | Self::Embedding(_) | Self::Email(_) => upstream(),
            Self::Order(err) => match err {
                OrderError::ProductUnavailable(_) | OrderError::NotFound => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                OrderError::Forbidden => (StatusCode::FORBIDDEN, err.to_string()),
                OrderError::MissingAddress
                | OrderError::NotCancellable(_)
                | OrderError::InvalidTransition(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                OrderError::Repository(err) => repository(err),
            },
            Self::Otp(err) => match err {
                OtpError::Rejected(r) => rejection(*r),
                OtpError::Repository(err) => repository(err),
                OtpError::Identity(err) => identity(err),
                OtpError::Email(_) => upstream(),
            },
            Self::Product(err) => match err {
                ProductError::NotVerified | ProductError::Forbidden => {
                    (StatusCode::FORBIDDEN, err.to_string())
                }
                ProductError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
                ProductError::TooManyImages => (StatusCode::BAD_REQUEST, err.to_string()),
                ProductError::Repository(err) => repository(err),
                ProductError::Asset(_) | ProductError::Embedding(_) => upstream(),
            },
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, try again later".to_string(),
            ),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.parts();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("order", "Placed orders", Some(&[("count", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lasu_mart_core::{DeliveryStatus, ProductId, StatusTransitionError};

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_order_error_status_codes() {
        assert_eq!(
            get_status(OrderError::ProductUnavailable(ProductId::random()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(get_status(OrderError::Forbidden.into()), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(OrderError::NotCancellable(DeliveryStatus::Delivered).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                OrderError::InvalidTransition(StatusTransitionError::Terminal(
                    DeliveryStatus::Cancelled
                ))
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_otp_rejection_status_codes() {
        assert_eq!(
            get_status(OtpError::Rejected(OtpRejection::Expired).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(OtpError::Rejected(OtpRejection::Invalid).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(OtpError::Rejected(OtpRejection::RecipientMismatch).into()),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_repository_conflict_is_409() {
        assert_eq!(
            get_status(RepositoryError::Conflict("category already exists".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_identity_errors_use_lookup_table() {
        let err = IdentityError::Rejected {
            code: "auth/email-already-exists".to_string(),
            message: "EMAIL_EXISTS".to_string(),
        };
        assert_eq!(get_status(err.into()), StatusCode::BAD_REQUEST);

        let err = IdentityError::Api {
            status: 503,
            message: "down".to_string(),
        };
        assert_eq!(get_status(err.into()), StatusCode::BAD_GATEWAY);
        assert_eq!(
            get_status(IdentityError::InvalidToken.into()),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response = AppError::Internal("connection string leaked".to_string()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Internal server error");
    }
}
