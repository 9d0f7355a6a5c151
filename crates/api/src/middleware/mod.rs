//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with `request_id`)
//! 3. Request ID (reuse or generate, echo in the response)
//! 4. CORS (credentialed requests from configured origins)
//! 5. Security headers
//! 6. Session layer (signed cookie, `PostgreSQL` store)
//! 7. Rate limiting (governor), per client IP
//!
//! Authentication is an extractor ([`RequireAuth`]) rather than a layer so
//! public routes never touch the identity provider.

pub mod auth;
pub mod cors;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{RequireAdmin, RequireAuth, clear_current_user, set_current_user};
pub use cors::cors_layer;
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
