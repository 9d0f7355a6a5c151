//! Cloudinary signed upload client.
//!
//! Requests are signed by hashing the sorted parameters followed by the API
//! secret with SHA-256.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use super::{AssetError, AssetStore, UploadedAsset};
use crate::config::CloudinaryConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary-backed asset store.
#[derive(Clone)]
pub struct CloudinaryStore {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
}

impl CloudinaryStore {
    /// Create a new Cloudinary client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig) -> Result<Self, AssetError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{API_BASE}/{}/image/{action}", self.cloud_name)
    }

    fn sign(&self, params: &[(&str, &str)]) -> String {
        sign_params(params, self.api_secret.expose_secret())
    }
}

/// Signature over `params`: sorted `key=value` pairs joined with `&`, then
/// the secret appended, hashed with SHA-256 and hex encoded.
fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_unstable_by_key(|(key, _)| *key);

    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{to_sign}{secret}").as_bytes()))
}

async fn api_error(response: reqwest::Response) -> AssetError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    AssetError::Api { status, message }
}

#[async_trait]
impl AssetStore for CloudinaryStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        folder: &str,
    ) -> Result<UploadedAsset, AssetError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[("folder", folder), ("timestamp", timestamp.as_str())]);

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name.to_owned()))
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.to_owned())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AssetError::Invalid(e.to_string()))?;

        debug!(public_id = %uploaded.public_id, "Uploaded asset");
        Ok(UploadedAsset {
            public_id: uploaded.public_id,
            url: uploaded.secure_url,
        })
    }

    #[instrument(skip(self))]
    async fn destroy(&self, public_id: &str) -> Result<(), AssetError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", timestamp.as_str())]);

        let form = Form::new()
            .text("public_id", public_id.to_owned())
            .text("timestamp", timestamp)
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| AssetError::Invalid(e.to_string()))?;

        match destroyed.result.as_str() {
            "ok" => Ok(()),
            "not found" => {
                warn!(public_id, "Asset already deleted");
                Ok(())
            }
            other => Err(AssetError::Invalid(format!("unexpected destroy result: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_sorts_params() {
        let a = sign_params(&[("timestamp", "1700000000"), ("folder", "x")], "secret");
        let b = sign_params(&[("folder", "x"), ("timestamp", "1700000000")], "secret");
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_matches_manual_digest() {
        let expected = hex::encode(Sha256::digest(
            b"folder=lasu_mart/products&timestamp=1700000000secret",
        ));
        assert_eq!(
            sign_params(
                &[("timestamp", "1700000000"), ("folder", "lasu_mart/products")],
                "secret"
            ),
            expected
        );
    }

    #[test]
    fn test_signature_depends_on_secret() {
        let params = [("public_id", "abc"), ("timestamp", "1")];
        assert_ne!(sign_params(&params, "one"), sign_params(&params, "two"));
    }
}
