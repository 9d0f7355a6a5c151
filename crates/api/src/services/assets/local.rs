//! Filesystem asset store for development.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use super::{AssetError, AssetStore, UploadedAsset, extension_of};

/// Writes assets under a directory that is served at `public_url`.
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
    public_url: Url,
}

impl LocalAssetStore {
    #[must_use]
    pub const fn new(root: PathBuf, public_url: Url) -> Self {
        Self { root, public_url }
    }

    /// Resolve a public id to a path under `root`, refusing anything that
    /// could escape it.
    fn path_for(&self, public_id: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(public_id);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if public_id.is_empty() || !safe {
            return Err(AssetError::Invalid(format!("bad asset id: {public_id}")));
        }
        Ok(self.root.join(relative))
    }

    fn url_for(&self, public_id: &str) -> Result<String, AssetError> {
        self.public_url
            .join(public_id)
            .map(String::from)
            .map_err(|e| AssetError::Invalid(e.to_string()))
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        folder: &str,
    ) -> Result<UploadedAsset, AssetError> {
        let public_id = format!("{folder}/{}{}", Uuid::new_v4(), extension_of(file_name));
        let path = self.path_for(&public_id)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        debug!(public_id = %public_id, "Stored asset on disk");
        Ok(UploadedAsset {
            url: self.url_for(&public_id)?,
            public_id,
        })
    }

    #[instrument(skip(self))]
    async fn destroy(&self, public_id: &str) -> Result<(), AssetError> {
        let path = self.path_for(public_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
