//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::assets::AssetStore;
use crate::services::chat_hub::ChatHub;
use crate::services::email::EmailService;
use crate::services::embeddings::Embedder;
use crate::services::identity::IdentityProvider;

/// External collaborators, injected at startup.
///
/// Production wires the HTTP clients; tests pass in-memory fakes.
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub assets: Arc<dyn AssetStore>,
    pub embedder: Arc<dyn Embedder>,
    pub email: Option<EmailService>,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    identity: Arc<dyn IdentityProvider>,
    assets: Arc<dyn AssetStore>,
    embedder: Arc<dyn Embedder>,
    email: Option<EmailService>,
    chat_hub: ChatHub,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool, collaborators: Collaborators) -> Self {
        let Collaborators {
            identity,
            assets,
            embedder,
            email,
        } = collaborators;

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                identity,
                assets,
                embedder,
                email,
                chat_hub: ChatHub::new(),
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    #[must_use]
    pub fn assets(&self) -> &dyn AssetStore {
        self.inner.assets.as_ref()
    }

    #[must_use]
    pub fn embedder(&self) -> &dyn Embedder {
        self.inner.embedder.as_ref()
    }

    /// The SMTP mailer, when one is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    #[must_use]
    pub fn chat_hub(&self) -> &ChatHub {
        &self.inner.chat_hub
    }
}
