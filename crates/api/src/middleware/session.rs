//! Session middleware configuration.
//!
//! Sessions live in `tower_sessions.session` and the cookie is signed with
//! the configured secret. Production cookies are `Secure` and
//! `SameSite=None` so the web client on another origin can send them.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ApiConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "lasu_mart_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// The signing key could not be derived from the session secret.
#[derive(Debug, Error)]
#[error("invalid session signing key: {0}")]
pub struct SessionKeyError(String);

/// Create the signed session layer with `PostgreSQL` store.
///
/// # Errors
///
/// Returns an error if the session secret is too short to sign cookies.
pub fn create_session_layer(
    pool: &PgPool,
    config: &ApiConfig,
) -> Result<SessionManagerLayer<PostgresStore, SignedCookie>, SessionKeyError> {
    // The table is created by the migrations, not by the store.
    let store = PostgresStore::new(pool.clone());

    let key = Key::try_from(config.session_secret.expose_secret().as_bytes())
        .map_err(|e| SessionKeyError(e.to_string()))?;

    let production = config.environment.is_production();
    let same_site = if production {
        SameSite::None
    } else {
        SameSite::Lax
    };

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(production)
        .with_same_site(same_site)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}
