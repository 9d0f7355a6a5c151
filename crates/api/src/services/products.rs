//! Vendor-side catalog operations.
//!
//! Listing a product touches three systems: the embedding service, the asset
//! host and the database. Assets uploaded for a write that then fails are
//! destroyed again before the error is returned.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use lasu_mart_core::{ProductId, UserId};

use crate::db::products::MAX_PRODUCT_IMAGES;
use crate::db::{ProductRepository, RepositoryError, format_embedding};
use crate::models::{CurrentUser, NewProduct, ProductImage};
use crate::services::assets::{AssetError, AssetStore, PRODUCT_FOLDER};
use crate::services::email::EmailService;
use crate::services::embeddings::{Embedder, EmbeddingError};

/// An image file received in a multipart request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Errors from catalog writes.
#[derive(Debug, Error)]
pub enum ProductError {
    /// Listing requires a verified email address and phone number.
    #[error("verify your email and phone number before listing products")]
    NotVerified,

    #[error("product not found")]
    NotFound,

    #[error("only the vendor who listed this product can change it")]
    Forbidden,

    #[error("a product can have at most {MAX_PRODUCT_IMAGES} images")]
    TooManyImages,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Catalog writes with their collaborators.
pub struct Catalog<'a> {
    pool: &'a PgPool,
    assets: &'a dyn AssetStore,
    embedder: &'a dyn Embedder,
}

impl<'a> Catalog<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, assets: &'a dyn AssetStore, embedder: &'a dyn Embedder) -> Self {
        Self {
            pool,
            assets,
            embedder,
        }
    }

    /// List a new product for a verified vendor.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError::NotVerified`] for unverified callers,
    /// [`ProductError::TooManyImages`] past the image limit, or any
    /// collaborator failure.
    #[instrument(skip(self, vendor, product, images, mailer), fields(vendor_id = %vendor.uid, images = images.len()))]
    pub async fn create(
        &self,
        vendor: &CurrentUser,
        product: &NewProduct,
        images: Vec<ImageUpload>,
        mailer: Option<&EmailService>,
    ) -> Result<ProductId, ProductError> {
        if !vendor.verified.can_sell() {
            return Err(ProductError::NotVerified);
        }
        if images.len() > MAX_PRODUCT_IMAGES {
            return Err(ProductError::TooManyImages);
        }

        let embedding = format_embedding(&self.embedder.embed(&product.embedding_text()).await?);
        let uploaded = self.upload_all(images).await?;

        let repo = ProductRepository::new(self.pool);
        let id = match repo.create(&vendor.uid, product, &embedding, &uploaded).await {
            Ok(id) => id,
            Err(e) => {
                self.discard(&uploaded).await;
                return Err(e.into());
            }
        };

        info!(product_id = %id, "Product listed");

        if let Some(mailer) = mailer
            && let Err(e) = mailer
                .send_product_listed(
                    vendor.email.as_str(),
                    &vendor.display_name,
                    &product.product_name,
                    &product.price.to_string(),
                )
                .await
        {
            warn!(error = %e, "Failed to send listing confirmation");
        }

        Ok(id)
    }

    /// Replace a product's fields and append any new images.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError::NotFound`], [`ProductError::Forbidden`],
    /// [`ProductError::TooManyImages`] or a collaborator failure.
    #[instrument(skip(self, caller, product, images), fields(product_id = %id, caller = %caller))]
    pub async fn update(
        &self,
        id: ProductId,
        caller: &UserId,
        product: &NewProduct,
        images: Vec<ImageUpload>,
    ) -> Result<(), ProductError> {
        self.ensure_owner(id, caller).await?;
        if images.len() > MAX_PRODUCT_IMAGES {
            return Err(ProductError::TooManyImages);
        }

        let embedding = format_embedding(&self.embedder.embed(&product.embedding_text()).await?);
        let uploaded = self.upload_all(images).await?;

        let repo = ProductRepository::new(self.pool);
        if let Err(e) = repo.update(id, product, &embedding, &uploaded).await {
            self.discard(&uploaded).await;
            return Err(match e {
                RepositoryError::Conflict(msg) if msg.contains("images") => {
                    ProductError::TooManyImages
                }
                RepositoryError::NotFound => ProductError::NotFound,
                other => other.into(),
            });
        }

        info!("Product updated");
        Ok(())
    }

    /// Delete a product, its image rows, then its hosted images.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError::NotFound`] or [`ProductError::Forbidden`].
    /// Asset host failures after the rows are gone are logged, not returned.
    #[instrument(skip(self, caller), fields(product_id = %id, caller = %caller))]
    pub async fn delete(&self, id: ProductId, caller: &UserId) -> Result<(), ProductError> {
        self.ensure_owner(id, caller).await?;

        let public_ids = ProductRepository::new(self.pool)
            .delete(id)
            .await
            .map_err(not_found)?;

        let purged = purge_assets(self.assets, &public_ids).await;
        info!(images = public_ids.len(), purged, "Product deleted");
        Ok(())
    }

    /// Remove one image from a product.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError::NotFound`] when the product or image is
    /// missing, or [`ProductError::Forbidden`] for non-owners.
    #[instrument(skip(self, caller), fields(product_id = %id, caller = %caller))]
    pub async fn delete_image(
        &self,
        id: ProductId,
        public_id: &str,
        caller: &UserId,
    ) -> Result<(), ProductError> {
        self.ensure_owner(id, caller).await?;

        ProductRepository::new(self.pool)
            .delete_image(id, public_id)
            .await
            .map_err(not_found)?;

        if let Err(e) = self.assets.destroy(public_id).await {
            warn!(public_id = %public_id, error = %e, "Failed to delete product image asset");
        }
        Ok(())
    }

    async fn ensure_owner(&self, id: ProductId, caller: &UserId) -> Result<(), ProductError> {
        let vendor = ProductRepository::new(self.pool)
            .vendor_of(id)
            .await?
            .ok_or(ProductError::NotFound)?;

        if &vendor != caller {
            return Err(ProductError::Forbidden);
        }
        Ok(())
    }

    async fn upload_all(&self, images: Vec<ImageUpload>) -> Result<Vec<ProductImage>, ProductError> {
        let mut uploaded = Vec::with_capacity(images.len());
        for image in images {
            match self
                .assets
                .upload(image.bytes, &image.file_name, PRODUCT_FOLDER)
                .await
            {
                Ok(asset) => uploaded.push(ProductImage {
                    image_public_id: asset.public_id,
                    image_url: asset.url,
                }),
                Err(e) => {
                    self.discard(&uploaded).await;
                    return Err(e.into());
                }
            }
        }
        Ok(uploaded)
    }

    async fn discard(&self, images: &[ProductImage]) {
        let ids: Vec<String> = images.iter().map(|i| i.image_public_id.clone()).collect();
        purge_assets(self.assets, &ids).await;
    }
}

fn not_found(e: RepositoryError) -> ProductError {
    match e {
        RepositoryError::NotFound => ProductError::NotFound,
        other => other.into(),
    }
}

/// Destroy every asset in `public_ids`, logging failures.
///
/// Returns how many were destroyed.
pub async fn purge_assets(store: &dyn AssetStore, public_ids: &[String]) -> usize {
    let mut destroyed = 0;
    for public_id in public_ids {
        match store.destroy(public_id).await {
            Ok(()) => destroyed += 1,
            Err(e) => warn!(public_id = %public_id, error = %e, "Failed to delete asset"),
        }
    }
    destroyed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::services::assets::UploadedAsset;

    /// Records destroy calls; fails for ids starting with `bad`.
    #[derive(Default)]
    struct RecordingStore {
        destroyed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AssetStore for RecordingStore {
        async fn upload(
            &self,
            _bytes: Vec<u8>,
            file_name: &str,
            folder: &str,
        ) -> Result<UploadedAsset, AssetError> {
            Ok(UploadedAsset {
                public_id: format!("{folder}/{file_name}"),
                url: format!("https://assets.test/{folder}/{file_name}"),
            })
        }

        async fn destroy(&self, public_id: &str) -> Result<(), AssetError> {
            self.destroyed.lock().unwrap().push(public_id.to_string());
            if public_id.starts_with("bad") {
                return Err(AssetError::Invalid(public_id.to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_purge_destroys_every_asset() {
        let store = RecordingStore::default();
        let ids = vec!["p/1".to_string(), "p/2".to_string(), "p/3".to_string()];

        assert_eq!(purge_assets(&store, &ids).await, 3);
        assert_eq!(*store.destroyed.lock().unwrap(), ids);
    }

    #[tokio::test]
    async fn test_purge_keeps_going_after_failure() {
        let store = RecordingStore::default();
        let ids = vec!["p/1".to_string(), "bad/2".to_string(), "p/3".to_string()];

        assert_eq!(purge_assets(&store, &ids).await, 2);
        assert_eq!(store.destroyed.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_purge_nothing() {
        let store = RecordingStore::default();
        assert_eq!(purge_assets(&store, &[]).await, 0);
        assert!(store.destroyed.lock().unwrap().is_empty());
    }
}
