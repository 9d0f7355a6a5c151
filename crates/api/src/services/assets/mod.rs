//! Image hosting for product photos and profile pictures.
//!
//! Two backends: Cloudinary's signed upload API, and a local directory for
//! development. Both hand back a `public_id` that is later used to delete
//! the asset.

pub mod cloudinary;
pub mod local;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::AssetConfig;

pub use cloudinary::CloudinaryStore;
pub use local::LocalAssetStore;

/// Folder for product images.
pub const PRODUCT_FOLDER: &str = "lasu_mart/products";

/// Folder for profile photos.
pub const PROFILE_FOLDER: &str = "lasu_mart/profile_photos";

/// Errors that can occur when storing or deleting assets.
#[derive(Debug, Error)]
pub enum AssetError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Asset host returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Local filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The asset id or response could not be understood.
    #[error("Invalid asset: {0}")]
    Invalid(String),
}

/// A stored asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub public_id: String,
    pub url: String,
}

/// Somewhere images can be uploaded to and deleted from.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `bytes` under `folder`.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        folder: &str,
    ) -> Result<UploadedAsset, AssetError>;

    /// Delete an asset. Deleting an asset that is already gone succeeds.
    async fn destroy(&self, public_id: &str) -> Result<(), AssetError>;
}

/// Build the configured asset store.
///
/// # Errors
///
/// Returns `AssetError` if the backend cannot be initialized.
pub fn from_config(config: &AssetConfig) -> Result<Arc<dyn AssetStore>, AssetError> {
    match config {
        AssetConfig::Cloudinary(cloudinary) => Ok(Arc::new(CloudinaryStore::new(cloudinary)?)),
        AssetConfig::Local { root, public_url } => Ok(Arc::new(LocalAssetStore::new(
            root.clone(),
            public_url.clone(),
        ))),
    }
}

/// File extension (with the dot) from an uploaded file name, lowercased.
///
/// Only short alphanumeric extensions survive; anything else is dropped.
#[must_use]
pub fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.JPG"), ".jpg");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of("evil.p/h/p"), "");
        assert_eq!(extension_of("trailing."), "");
    }
}
