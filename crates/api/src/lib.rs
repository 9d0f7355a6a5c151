//! Lasu Mart API library.
//!
//! The REST API and chat WebSocket as a library, so the binary, the CLI and
//! the integration tests all assemble the same router and migrations.
//!
//! # External services
//!
//! - `PostgreSQL` (canonical store, sessions, pgvector search)
//! - Identity provider over HTTP (accounts, ID tokens, claims)
//! - Asset host (Cloudinary or local disk)
//! - Embedding service (product search vectors)
//! - SMTP (optional; OTP and listing emails)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, middleware::from_fn, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::session::SessionKeyError;
use crate::middleware::{
    cors_layer, create_session_layer, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Embedded database migrations (`crates/api/migrations`).
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Assemble the full application around `routes`.
///
/// Pass [`routes::rate_limited_routes`] when serving and [`routes::routes`]
/// in tests, where requests carry no peer address.
///
/// # Errors
///
/// Returns an error if the session secret cannot be used as a signing key.
pub fn build_router(state: AppState, routes: Router<AppState>) -> Result<Router, SessionKeyError> {
    let session_layer = create_session_layer(state.pool(), state.config())?;
    let cors = cors_layer(state.config());

    Ok(Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes)
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
        // Inside the trace layer so the id lands on the request span
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction()))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
