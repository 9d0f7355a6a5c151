//! HTTP client for the identity provider's admin API.
//!
//! Endpoints (relative to `IDENTITY_PROVIDER_URL`):
//!
//! - `POST   v1/accounts` - create an account
//! - `DELETE v1/accounts/{uid}` - delete an account
//! - `POST   v1/tokens:verify` - verify an ID token
//! - `GET    v1/accounts/{uid}/claims` - read custom claims
//! - `PUT    v1/accounts/{uid}/claims` - replace custom claims
//!
//! Failures carry `{"error": {"code": "auth/...", "message": "..."}}`.
//! Verified tokens are cached for five minutes, keyed by their SHA-256.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use url::Url;

use lasu_mart_core::UserId;

use super::{Claims, IdentityError, IdentityProvider, IdentityRecord, NewIdentity, VerifiedToken};
use crate::config::IdentityConfig;

/// How long a verified token is trusted without asking the provider again.
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Serialize)]
struct CreateAccountRequest<'a> {
    email: &'a str,
    password: &'a str,
    display_name: &'a str,
    phone_number: &'a str,
}

#[derive(Serialize)]
struct VerifyTokenRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

/// Identity provider reached over HTTP.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    inner: Arc<HttpIdentityProviderInner>,
}

struct HttpIdentityProviderInner {
    client: reqwest::Client,
    base_url: Url,
    token_cache: Cache<String, VerifiedToken>,
}

impl HttpIdentityProvider {
    /// Create a new identity provider client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| IdentityError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()?;

        let token_cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(TOKEN_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(HttpIdentityProviderInner {
                client,
                base_url: config.base_url.clone(),
                token_cache,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| IdentityError::Parse(format!("Invalid endpoint {path}: {e}")))
    }

    fn account_endpoint(&self, uid: &UserId, suffix: &str) -> Result<Url, IdentityError> {
        let mut url = self.endpoint("v1/accounts")?;
        url.path_segments_mut()
            .map_err(|()| IdentityError::Parse("identity base URL cannot be a base".into()))?
            .push(uid.as_str())
            .extend(suffix.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }
}

/// Turn a non-success response into an `IdentityError`.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, IdentityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => Err(IdentityError::Rejected {
            code: envelope.error.code,
            message: envelope.error.message,
        }),
        Err(_) => Err(IdentityError::Api {
            status: status.as_u16(),
            message: body,
        }),
    }
}

fn token_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: &NewIdentity) -> Result<IdentityRecord, IdentityError> {
        let body = CreateAccountRequest {
            email: user.email.as_str(),
            password: user.password.expose_secret(),
            display_name: &user.display_name,
            phone_number: user.phone_number.as_str(),
        };

        let response = self
            .inner
            .client
            .post(self.endpoint("v1/accounts")?)
            .json(&body)
            .send()
            .await?;

        check(response)
            .await?
            .json::<IdentityRecord>()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))
    }

    #[instrument(skip(self), fields(uid = %uid))]
    async fn delete_user(&self, uid: &UserId) -> Result<(), IdentityError> {
        let response = self
            .inner
            .client
            .delete(self.account_endpoint(uid, "")?)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedToken, IdentityError> {
        let key = token_key(token);
        if let Some(verified) = self.inner.token_cache.get(&key).await {
            debug!(uid = %verified.uid, "Token cache hit");
            return Ok(verified);
        }

        let response = self
            .inner
            .client
            .post(self.endpoint("v1/tokens:verify")?)
            .json(&VerifyTokenRequest { id_token: token })
            .send()
            .await?;

        let verified = match check(response).await {
            Ok(response) => response
                .json::<VerifiedToken>()
                .await
                .map_err(|e| IdentityError::Parse(e.to_string()))?,
            Err(IdentityError::Rejected { .. }) => return Err(IdentityError::InvalidToken),
            Err(IdentityError::Api { status, .. }) if (400..500).contains(&status) => {
                return Err(IdentityError::InvalidToken);
            }
            Err(e) => return Err(e),
        };

        self.inner.token_cache.insert(key, verified.clone()).await;
        Ok(verified)
    }

    #[instrument(skip(self), fields(uid = %uid))]
    async fn get_claims(&self, uid: &UserId) -> Result<Claims, IdentityError> {
        let response = self
            .inner
            .client
            .get(self.account_endpoint(uid, "claims")?)
            .send()
            .await?;

        check(response)
            .await?
            .json::<Claims>()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))
    }

    #[instrument(skip(self, claims), fields(uid = %uid))]
    async fn set_claims(&self, uid: &UserId, claims: &Claims) -> Result<(), IdentityError> {
        let response = self
            .inner
            .client
            .put(self.account_endpoint(uid, "claims")?)
            .json(claims)
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn provider(base: &str) -> HttpIdentityProvider {
        HttpIdentityProvider::new(&IdentityConfig {
            base_url: Url::parse(base).unwrap(),
            api_key: SecretString::from("test-key"),
        })
        .unwrap()
    }

    #[test]
    fn test_account_endpoint_escapes_uid() {
        let provider = provider("https://identity.example.com/");
        let url = provider
            .account_endpoint(&UserId::new("abc/def"), "claims")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://identity.example.com/v1/accounts/abc%2Fdef/claims"
        );
    }

    #[test]
    fn test_token_key_is_stable_and_opaque() {
        let key = token_key("header.payload.signature");
        assert_eq!(key, token_key("header.payload.signature"));
        assert_eq!(key.len(), 64);
        assert!(!key.contains("payload"));
    }
}
