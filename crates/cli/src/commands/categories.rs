//! Category management commands.

use lasu_mart_api::db::CategoryRepository;
use lasu_mart_api::models::NewCategory;

use super::{CliError, connect};

/// Add a category.
///
/// # Errors
///
/// Returns an error if the category already exists.
pub async fn add(title: &str, image_url: &str) -> Result<(), CliError> {
    let pool = connect().await?;

    let category = CategoryRepository::new(&pool)
        .create(&NewCategory {
            title: title.trim().to_string(),
            image_url: image_url.to_string(),
        })
        .await?;

    tracing::info!("Category added: {}", category.title);
    Ok(())
}

/// Remove a category. Products keep their rows with no category.
///
/// # Errors
///
/// Returns an error if no such category exists.
pub async fn remove(title: &str) -> Result<(), CliError> {
    let pool = connect().await?;

    CategoryRepository::new(&pool).delete(title.trim()).await?;

    tracing::info!("Category removed: {}", title.trim());
    Ok(())
}
