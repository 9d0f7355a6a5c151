//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (stricter rate limit)
//! POST   /auth/register            - Create an account
//! POST   /auth/login               - Exchange an ID token for a session
//! POST   /auth/logout              - End the session
//! GET    /auth/verify              - Current session user
//! POST   /auth/otp                 - Send a one-time code (email|phone)
//! POST   /auth/otp/verify          - Verify a one-time code
//!
//! # User (requires auth)
//! GET    /user                     - Profile with cart item count
//! PUT    /user                     - Update profile
//! POST   /user/photo               - Upload profile photo (multipart)
//! DELETE /user/photo               - Remove profile photo
//! GET    /user/cart                - Cart lines
//! POST   /user/cart                - Add to cart
//! DELETE /user/cart                - Remove from cart
//!
//! # Products
//! GET    /product                  - Filtered, paginated listing
//! GET    /product/search           - Semantic search
//! GET    /product/trending         - Most ordered in the last 30 days
//! GET    /product/{id}             - Product detail
//! GET    /product/vendor           - Caller's listings
//! POST   /product/vendor           - List a product (multipart)
//! POST   /product/vendor/{id}      - Update a listing (multipart)
//! DELETE /product/{id}             - Delete a listing
//! DELETE /product/{id}/images      - Delete one image (?public_id=)
//!
//! # Orders (requires auth)
//! GET    /orders/user              - Order history
//! POST   /orders/user              - Place orders from the cart
//! GET    /orders/user/{id}         - Order detail
//! DELETE /orders/user/{id}         - Cancel an order
//! GET    /orders/vendor            - Orders for the caller's products
//! POST   /orders/vendor/{id}/status - Advance delivery status
//!
//! # Reviews
//! GET    /reviews/{product_id}     - Reviews for a product
//! POST   /reviews                  - Add a review
//! DELETE /reviews/{review_id}      - Delete a review (author or admin)
//!
//! # Categories
//! GET    /category                 - All categories
//! POST   /category                 - Add (admin)
//! DELETE /category/{title}         - Remove (admin)
//!
//! # Notifications (requires auth)
//! GET    /notifications            - Caller's notifications
//! POST   /notifications/{id}       - Mark one read
//!
//! # Chat (requires auth)
//! GET    /chat                     - Caller's chats
//! POST   /chat                     - Start a chat with a vendor
//! GET    /chat/socket              - WebSocket (?chat_id=)
//! GET    /chat/{chat_id}           - Messages
//! ```

pub mod auth;
pub mod categories;
pub mod chat;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Request body limit for routes that accept image uploads (5 images).
pub const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/verify", get(auth::verify))
        .route("/otp", post(auth::send_otp))
        .route("/otp/verify", post(auth::verify_otp))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::profile).put(users::update_profile))
        .route(
            "/photo",
            post(users::upload_photo).delete(users::delete_photo),
        )
        .route(
            "/cart",
            get(users::cart)
                .post(users::add_to_cart)
                .delete(users::remove_from_cart),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list))
        .route("/search", get(products::search))
        .route("/trending", get(products::trending))
        .route(
            "/vendor",
            get(products::vendor_products).post(products::create),
        )
        .route("/vendor/{id}", post(products::update))
        .route("/{id}", get(products::show).delete(products::delete))
        .route("/{id}/images", axum::routing::delete(products::delete_image))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(orders::history).post(orders::place))
        .route("/user/{id}", get(orders::show).delete(orders::cancel))
        .route("/vendor", get(orders::vendor_orders))
        .route("/vendor/{id}/status", post(orders::update_status))
}

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(reviews::create))
        .route("/{id}", get(reviews::list).delete(reviews::delete))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::list).post(categories::create))
        .route("/{title}", axum::routing::delete(categories::delete))
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list))
        .route("/{id}", post(notifications::mark_read))
}

/// Create the chat routes router.
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(chat::list).post(chat::start))
        .route("/socket", get(chat::socket))
        .route("/{chat_id}", get(chat::messages))
}

/// Everything except `/auth`.
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/user", user_routes())
        .nest("/product", product_routes())
        .nest("/orders", order_routes())
        .nest("/reviews", review_routes())
        .nest("/category", category_routes())
        .nest("/notifications", notification_routes())
        .nest("/chat", chat_routes())
}

/// Create all API routes without rate limiting.
pub fn routes() -> Router<AppState> {
    api_routes().nest("/auth", auth_routes())
}

/// Create all API routes with per-IP rate limiting.
///
/// `/auth` gets the stricter limiter. The server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()` so the peer address
/// is available when no proxy header is present.
pub fn rate_limited_routes() -> Router<AppState> {
    api_routes()
        .layer(api_rate_limiter())
        .nest("/auth", auth_routes().layer(auth_rate_limiter()))
}
