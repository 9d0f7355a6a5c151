//! Lasu Mart API server.
//!
//! Serves the marketplace REST API and the chat WebSocket on
//! `MART_HOST:MART_PORT` (default `127.0.0.1:5050`).
//!
//! # Architecture
//!
//! - Axum web framework
//! - `PostgreSQL` for all data, sessions and vector search
//! - Identity provider, asset host and embedding service over HTTP
//! - SMTP for one-time codes and listing confirmations (optional)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use lasu_mart_api::config::{ApiConfig, LogFormat};
use lasu_mart_api::services::assets;
use lasu_mart_api::services::email::EmailService;
use lasu_mart_api::services::embeddings::EmbeddingClient;
use lasu_mart_api::services::identity::HttpIdentityProvider;
use lasu_mart_api::state::{AppState, Collaborators};
use lasu_mart_api::{build_router, db, routes};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Build the external service clients from configuration.
///
/// # Panics
///
/// Panics if a client cannot be constructed (bad URL, TLS setup failure).
fn collaborators(config: &ApiConfig) -> Collaborators {
    let identity =
        HttpIdentityProvider::new(&config.identity).expect("Failed to create identity client");
    let embedder =
        EmbeddingClient::new(&config.embedding).expect("Failed to create embedding client");
    let assets = assets::from_config(&config.assets).expect("Failed to create asset store");

    let email = config.email.as_ref().and_then(|email| {
        EmailService::new(email)
            .inspect_err(|e| tracing::error!(error = %e, "SMTP disabled"))
            .ok()
    });
    if email.is_none() {
        tracing::warn!("No SMTP transport configured; codes will only be logged");
    }

    Collaborators {
        identity: Arc::new(identity),
        assets,
        embedder: Arc::new(embedder),
        email,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ApiConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lasu_mart_api=info,tower_http=debug".into());

    let json = config.log_format == LogFormat::Json;
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p lasu-mart-cli -- migrate

    let collaborators = collaborators(&config);
    let addr = config.socket_addr();
    let state = AppState::new(config, pool, collaborators);

    let app = build_router(state, routes::rate_limited_routes())
        .expect("Failed to create session layer");

    tracing::info!("api listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
