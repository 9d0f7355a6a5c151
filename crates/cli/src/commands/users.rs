//! User role management.
//!
//! The role lives in two places: the identity provider's claims (read on
//! every token verification) and the `users` row (used for listings and
//! moderation). Both are updated, claims first.

use lasu_mart_api::config::IdentityConfig;
use lasu_mart_api::db::UserRepository;
use lasu_mart_api::services::identity::{HttpIdentityProvider, IdentityProvider};
use lasu_mart_core::{Email, Role};
use secrecy::SecretString;
use url::Url;

use super::{CliError, connect};

fn identity_config() -> Result<IdentityConfig, CliError> {
    let base_url = std::env::var("IDENTITY_PROVIDER_URL")
        .map_err(|_| CliError::MissingEnvVar("IDENTITY_PROVIDER_URL"))?;
    let base_url = Url::parse(&base_url)
        .map_err(|e| CliError::InvalidEnvVar("IDENTITY_PROVIDER_URL", e.to_string()))?;
    let api_key = std::env::var("IDENTITY_PROVIDER_API_KEY")
        .map_err(|_| CliError::MissingEnvVar("IDENTITY_PROVIDER_API_KEY"))?;

    Ok(IdentityConfig {
        base_url,
        api_key: SecretString::from(api_key),
    })
}

/// Set the role of the user registered with `email`.
///
/// Existing sessions keep the old role until the user logs in again.
///
/// # Errors
///
/// Returns an error if the user is unknown or either update fails.
pub async fn set_role(email: &str, role: Role) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(|_| CliError::InvalidEmail(email.to_owned()))?;

    let pool = connect().await?;
    let identity = HttpIdentityProvider::new(&identity_config()?)?;
    let users = UserRepository::new(&pool);

    let uid = users
        .find_uid_by_email(&email)
        .await?
        .ok_or_else(|| CliError::UnknownUser(email.to_string()))?;

    let mut claims = identity.get_claims(&uid).await?;
    claims.role = role;
    identity.set_claims(&uid, &claims).await?;
    users.set_role(&uid, role).await?;

    tracing::info!("Role updated: {} is now {}", email, role);
    Ok(())
}
