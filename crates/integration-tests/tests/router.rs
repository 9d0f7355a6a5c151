//! Router tests that never reach the database.
//!
//! The pool is lazy, so every request here must be answered before a
//! handler touches `PostgreSQL`.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use lasu_mart_integration_tests::TestApp;
use serde_json::Value;
use tower::ServiceExt;

async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_is_ok() {
    let app = TestApp::lazy();
    let response = send(&app, get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_responses_carry_security_headers_and_request_id() {
    let app = TestApp::lazy();
    let response = send(
        &app,
        Request::builder()
            .uri("/health")
            .header("x-request-id", "req-123")
            .body(Body::empty())
            .expect("valid request"),
    )
    .await;

    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-123");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_unusable_request_id_is_replaced() {
    let app = TestApp::lazy();
    let response = send(
        &app,
        Request::builder()
            .uri("/health")
            .header("x-request-id", "has spaces")
            .body(Body::empty())
            .expect("valid request"),
    )
    .await;

    let id = response.headers()["x-request-id"]
        .to_str()
        .expect("ascii header");
    assert_ne!(id, "has spaces");
    assert_eq!(id.len(), 36);
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_protected_routes_require_auth() {
    let app = TestApp::lazy();

    let requests = [
        get("/user"),
        get("/user/cart"),
        get("/auth/verify"),
        get("/orders/user"),
        get("/orders/vendor"),
        get("/notifications"),
        get("/chat"),
        get("/product/vendor"),
        json_request("POST", "/orders/user", "{}"),
        json_request("POST", "/reviews", r#"{"product_id":"x","rating":5,"comment":"ok"}"#),
        json_request("POST", "/auth/otp", r#"{"kind":"email"}"#),
        json_request("POST", "/category", r#"{"category_title":"Books"}"#),
    ];

    for request in requests {
        let uri = request.uri().to_string();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");

        let body = body_json(response).await;
        assert_eq!(body["message"], "Authentication required", "{uri}");
    }
}

#[tokio::test]
async fn test_unknown_bearer_token_is_rejected() {
    let app = TestApp::lazy();
    let response = send(
        &app,
        Request::builder()
            .uri("/user")
            .header(header::AUTHORIZATION, "Bearer forged")
            .body(Body::empty())
            .expect("valid request"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_chat_socket_requires_auth_before_upgrade() {
    let app = TestApp::lazy();
    let response = send(
        &app,
        get("/chat/socket?chat_id=00000000-0000-0000-0000-000000000000"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Catalog short-circuits
// =============================================================================

#[tokio::test]
async fn test_search_with_inverted_price_range_is_empty() {
    let app = TestApp::lazy();
    let response = send(
        &app,
        get("/product/search?search_term=shoes&min_price=5000&max_price=100"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"], serde_json::json!([]));
    assert_eq!(body["total_pages"], 0);
    assert_eq!(app.embedder.calls(), 0);
}

#[tokio::test]
async fn test_listing_with_inverted_price_range_is_empty() {
    let app = TestApp::lazy();
    let response = send(&app, get("/product?min_price=10&max_price=1")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_pages"], 0);
}

#[tokio::test]
async fn test_search_requires_a_term() {
    let app = TestApp::lazy();

    for uri in ["/product/search", "/product/search?search_term=%20%20"] {
        let response = send(&app, get(uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
    assert_eq!(app.embedder.calls(), 0);
}

#[tokio::test]
async fn test_unknown_sort_column_is_rejected() {
    let app = TestApp::lazy();
    let response = send(
        &app,
        get("/product?sort_by=price;DROP%20TABLE%20products"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::lazy();
    let response = send(&app, get("/nope")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
