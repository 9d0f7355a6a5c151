//! Order placement against a real database.
//!
//! Requires `PostgreSQL` with the pgvector extension at `DATABASE_URL`.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use lasu_mart_api::db::{CartRepository, NotificationRepository, ProductRepository, format_embedding};
use lasu_mart_api::models::{CurrentUser, MAX_LINE_QUANTITY, NewProduct};
use lasu_mart_api::services::embeddings::EMBEDDING_DIMENSIONS;
use lasu_mart_api::services::orders::{self, OrderError};
use lasu_mart_core::{DeliveryStatus, PaymentMethod, ProductId};
use lasu_mart_integration_tests::TestApp;
use tower::ServiceExt;

async fn list_product(app: &TestApp, vendor: &CurrentUser, name: &str, price: &str) -> ProductId {
    let product = NewProduct {
        product_name: name.to_string(),
        price: price.parse().expect("valid price"),
        category: None,
        description: format!("{name} for testing"),
    };
    ProductRepository::new(app.pool())
        .create(
            &vendor.uid,
            &product,
            &format_embedding(&vec![0.1; EMBEDDING_DIMENSIONS]),
            &[],
        )
        .await
        .expect("create product")
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_placing_orders_consumes_the_whole_cart() {
    let app = TestApp::connect().await;
    let (vendor, _) = app.create_user("vendor", true).await;
    let (buyer, _) = app.create_user("buyer", false).await;

    let rice = list_product(&app, &vendor, "Rice", "4500").await;
    let beans = list_product(&app, &vendor, "Beans", "3000").await;

    let carts = CartRepository::new(app.pool());
    carts.add(&buyer.uid, rice, None, 2).await.expect("add rice");
    carts.add(&buyer.uid, beans, Some("5kg"), 1).await.expect("add beans");
    carts.add(&buyer.uid, rice, None, 1).await.expect("add more rice");

    let placed = orders::place(app.pool(), &buyer.uid, "Hall 3", PaymentMethod::OnDelivery)
        .await
        .expect("orders placed");

    assert_eq!(placed.len(), 2);
    assert!(placed.iter().all(|o| o.delivery_status == DeliveryStatus::Pending));
    let rice_order = placed
        .iter()
        .find(|o| o.product_id == Some(rice))
        .expect("rice order");
    assert_eq!(rice_order.quantity_ordered, 3);
    assert_eq!(carts.count(&buyer.uid).await.expect("count"), 0);

    let notifications = NotificationRepository::new(app.pool())
        .list(&vendor.uid)
        .await
        .expect("notifications");
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].message, "You have 2 new orders");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_rejected_placement_leaves_cart_untouched() {
    let app = TestApp::connect().await;
    let (vendor, _) = app.create_user("vendor", true).await;
    let (buyer, _) = app.create_user("buyer", false).await;
    let rice = list_product(&app, &vendor, "Rice", "4500").await;

    let carts = CartRepository::new(app.pool());
    carts.add(&buyer.uid, rice, None, 1).await.expect("add rice");

    let err = orders::place(app.pool(), &buyer.uid, "   ", PaymentMethod::OnDelivery)
        .await
        .expect_err("blank address");
    assert!(matches!(err, OrderError::MissingAddress));
    assert_eq!(carts.count(&buyer.uid).await.expect("count"), 1);
}

/// Make every notification for vendors named `display_name` fail.
async fn reject_notifications_for(app: &TestApp, display_name: &str) {
    let function = format!(
        r"
        CREATE OR REPLACE FUNCTION reject_test_notifications() RETURNS trigger
        LANGUAGE plpgsql AS $$
        BEGIN
            IF EXISTS (
                SELECT 1 FROM users
                WHERE user_id = NEW.user_id AND display_name = '{display_name}'
            ) THEN
                RAISE EXCEPTION 'notification rejected';
            END IF;
            RETURN NEW;
        END
        $$
        "
    );
    sqlx::raw_sql(&function)
        .execute(app.pool())
        .await
        .expect("create trigger function");
    sqlx::raw_sql(
        r"
        CREATE OR REPLACE TRIGGER reject_test_notifications
        BEFORE INSERT ON notifications
        FOR EACH ROW EXECUTE FUNCTION reject_test_notifications()
        ",
    )
    .execute(app.pool())
    .await
    .expect("create trigger");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_failure_after_inserting_orders_rolls_everything_back() {
    let app = TestApp::connect().await;
    let (vendor, _) = app.create_user("failing-vendor", true).await;
    let (buyer, _) = app.create_user("buyer", false).await;
    reject_notifications_for(&app, "failing-vendor").await;

    let rice = list_product(&app, &vendor, "Rice", "4500").await;
    let beans = list_product(&app, &vendor, "Beans", "3000").await;
    let carts = CartRepository::new(app.pool());
    carts.add(&buyer.uid, rice, None, 2).await.expect("add rice");
    carts.add(&buyer.uid, beans, None, 1).await.expect("add beans");

    let err = orders::place(app.pool(), &buyer.uid, "Hall 3", PaymentMethod::OnDelivery)
        .await
        .expect_err("notification insert fails");
    assert!(matches!(err, OrderError::Repository(_)));

    let placed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(buyer.uid.as_str())
        .fetch_one(app.pool())
        .await
        .expect("count orders");
    assert_eq!(placed, 0);

    let cart = carts.list(&buyer.uid).await.expect("cart");
    assert_eq!(cart.len(), 2);
    let rice_line = cart.iter().find(|l| l.product_id == rice).expect("rice line");
    assert_eq!(rice_line.quantity, 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_cart_quantity_is_capped() {
    let app = TestApp::connect().await;
    let (vendor, _) = app.create_user("vendor", true).await;
    let (buyer, _) = app.create_user("buyer", false).await;
    let rice = list_product(&app, &vendor, "Rice", "4500").await;

    let carts = CartRepository::new(app.pool());
    for _ in 0..3 {
        carts
            .add(&buyer.uid, rice, None, MAX_LINE_QUANTITY)
            .await
            .expect("add stays within the cap");
    }

    let cart = carts.list(&buyer.uid).await.expect("cart");
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, MAX_LINE_QUANTITY);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_empty_cart_places_nothing() {
    let app = TestApp::connect().await;
    let (buyer, _) = app.create_user("buyer", false).await;

    let placed = orders::place(app.pool(), &buyer.uid, "Hall 3", PaymentMethod::Paystack)
        .await
        .expect("empty cart is fine");
    assert!(placed.is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_only_the_buyer_can_cancel() {
    let app = TestApp::connect().await;
    let (vendor, _) = app.create_user("vendor", true).await;
    let (buyer, _) = app.create_user("buyer", false).await;
    let (_, stranger_token) = app.create_user("stranger", false).await;
    let rice = list_product(&app, &vendor, "Rice", "4500").await;

    CartRepository::new(app.pool())
        .add(&buyer.uid, rice, None, 1)
        .await
        .expect("add rice");
    let placed = orders::place(app.pool(), &buyer.uid, "Hall 3", PaymentMethod::OnDelivery)
        .await
        .expect("placed");
    let order_id = placed[0].order_id;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/orders/user/{order_id}"))
                .header(header::AUTHORIZATION, format!("Bearer {stranger_token}"))
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let cancelled = orders::cancel(app.pool(), order_id, &buyer.uid)
        .await
        .expect("buyer cancels");
    assert_eq!(cancelled.delivery_status, DeliveryStatus::Cancelled);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_only_the_vendor_can_advance_status() {
    let app = TestApp::connect().await;
    let (vendor, _) = app.create_user("vendor", true).await;
    let (buyer, _) = app.create_user("buyer", false).await;
    let rice = list_product(&app, &vendor, "Rice", "4500").await;

    CartRepository::new(app.pool())
        .add(&buyer.uid, rice, None, 1)
        .await
        .expect("add rice");
    let placed = orders::place(app.pool(), &buyer.uid, "Hall 3", PaymentMethod::OnDelivery)
        .await
        .expect("placed");
    let order_id = placed[0].order_id;

    let err = orders::update_status(app.pool(), order_id, &buyer.uid, DeliveryStatus::Active)
        .await
        .expect_err("buyer is not the vendor");
    assert!(matches!(err, OrderError::Forbidden));

    let order = orders::update_status(app.pool(), order_id, &vendor.uid, DeliveryStatus::Active)
        .await
        .expect("vendor advances");
    assert_eq!(order.delivery_status, DeliveryStatus::Active);
}
