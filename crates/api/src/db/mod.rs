//! Database operations for the marketplace `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `users` - Marketplace profiles keyed by identity-provider uid
//! - `categories`, `products`, `product_images` - Catalog
//! - `cart_lines`, `orders` - Purchase intents and placed orders
//! - `reviews`, `notifications` - Feedback and vendor alerts
//! - `auth_otps` - One-time verification codes
//! - `chats`, `chat_messages` - Buyer/vendor conversations
//! - `tower_sessions.session` - Session storage
//!
//! # Queries
//!
//! All queries are runtime-checked (`sqlx::query_as` with `FromRow`) because
//! pgvector columns have no compile-time type in `SQLx`. Dynamic filters go
//! through `sqlx::QueryBuilder`; sort columns come from enums, never from
//! request text.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p lasu-mart-cli -- migrate
//! ```

pub mod carts;
pub mod categories;
pub mod chats;
pub mod notifications;
pub mod orders;
pub mod otps;
pub mod products;
pub mod reviews;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use categories::CategoryRepository;
pub use chats::ChatRepository;
pub use notifications::NotificationRepository;
pub use orders::OrderRepository;
pub use otps::OtpRepository;
pub use products::ProductRepository;
pub use reviews::ReviewRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to `Conflict` with a caller
    /// supplied message; everything else stays a database error.
    pub(crate) fn from_constraint(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Format an embedding vector as a pgvector literal (`[0.1,0.2]`).
///
/// Bound as text and cast with `$n::vector` in SQL.
#[must_use]
pub fn format_embedding(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding.iter().map(ToString::to_string).collect();
    format!("[{}]", values.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_embedding() {
        assert_eq!(format_embedding(&[0.1, 0.2, 0.3]), "[0.1,0.2,0.3]");
    }

    #[test]
    fn test_format_embedding_empty() {
        assert_eq!(format_embedding(&[]), "[]");
    }

    #[test]
    fn test_non_constraint_errors_stay_database_errors() {
        let err = RepositoryError::from_constraint(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
