//! One-time code maintenance.

use lasu_mart_api::db::OtpRepository;

use super::{CliError, connect};

/// Delete every expired code. Returns how many were removed.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub async fn purge() -> Result<u64, CliError> {
    let pool = connect().await?;

    let removed = OtpRepository::new(&pool).purge_expired().await?;

    tracing::info!("Purged {} expired codes", removed);
    Ok(removed)
}
