//! Command implementations.
//!
//! # Environment Variables
//!
//! - `MART_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `IDENTITY_PROVIDER_URL`, `IDENTITY_PROVIDER_API_KEY` - for role changes

pub mod categories;
pub mod migrate;
pub mod otp;
pub mod users;

use lasu_mart_api::db::{self, RepositoryError};
use lasu_mart_api::services::identity::IdentityError;
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("No user with email: {0}")]
    UnknownUser(String),
}

/// Connect to the marketplace database.
async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("MART_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnvVar("MART_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&SecretString::from(database_url)).await?)
}
