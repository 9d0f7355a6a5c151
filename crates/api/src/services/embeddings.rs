//! Text embedding client for product search.
//!
//! Products and search terms are embedded by a small HTTP service returning
//! 384-dimensional vectors, which are stored and compared with pgvector.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::EmbeddingConfig;

/// Vector width the `products.embedding` column is declared with.
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Errors that can occur when generating embeddings.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("embedding service error ({status}): {body}")]
    Service { status: u16, body: String },

    /// The service answered with something unusable.
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
}

/// Anything that can turn text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `text`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Request body for the embedding service.
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    text: &'a str,
}

/// Response from the embedding service.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Client for the embedding service.
#[derive(Clone)]
pub struct EmbeddingClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl EmbeddingClient {
    /// Create a new embedding client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL cannot be built or the HTTP
    /// client fails to build.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let endpoint = config
            .base_url
            .join("api/embeddings")
            .map_err(|e| EmbeddingError::InvalidResponse(format!("bad service URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&EmbeddingRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let response: EmbeddingResponse = response.json().await?;
        check_dimensions(response.embedding)
    }
}

fn check_dimensions(embedding: Vec<f32>) -> Result<Vec<f32>, EmbeddingError> {
    if embedding.len() != EMBEDDING_DIMENSIONS {
        return Err(EmbeddingError::InvalidResponse(format!(
            "Expected {} dimensions, got {}",
            EMBEDDING_DIMENSIONS,
            embedding.len()
        )));
    }
    Ok(embedding)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_is_joined_to_base() {
        let client = EmbeddingClient::new(&EmbeddingConfig {
            base_url: Url::parse("http://embedder:8000/").unwrap(),
        })
        .unwrap();
        assert_eq!(client.endpoint.as_str(), "http://embedder:8000/api/embeddings");
    }

    #[test]
    fn test_dimension_check() {
        assert!(check_dimensions(vec![0.0; EMBEDDING_DIMENSIONS]).is_ok());
        assert!(matches!(
            check_dimensions(vec![0.0; 3]),
            Err(EmbeddingError::InvalidResponse(_))
        ));
    }
}
