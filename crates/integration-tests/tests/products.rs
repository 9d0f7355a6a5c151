//! Vendor catalog writes against a real database.

use lasu_mart_api::db::{CartRepository, ProductRepository};
use lasu_mart_api::models::NewProduct;
use lasu_mart_api::services::products::{Catalog, ImageUpload, ProductError};
use lasu_mart_integration_tests::TestApp;

fn product(name: &str) -> NewProduct {
    NewProduct {
        product_name: name.to_string(),
        price: "2500".parse().expect("valid price"),
        category: None,
        description: "Lightly used".to_string(),
    }
}

fn images(n: usize) -> Vec<ImageUpload> {
    (0..n)
        .map(|i| ImageUpload {
            file_name: format!("photo{i}.jpg"),
            bytes: vec![0xFF, 0xD8, 0xFF],
        })
        .collect()
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_deleting_a_product_destroys_its_images() {
    let app = TestApp::connect().await;
    let (vendor, _) = app.create_user("vendor", true).await;
    let catalog = Catalog::new(app.pool(), app.assets.as_ref(), app.embedder.as_ref());

    let id = catalog
        .create(&vendor, &product("Desk lamp"), images(2), None)
        .await
        .expect("listed");
    assert_eq!(app.embedder.calls(), 1);

    let stored = ProductRepository::new(app.pool())
        .get(id)
        .await
        .expect("query")
        .expect("product exists");
    assert_eq!(stored.images.len(), 2);

    catalog.delete(id, &vendor.uid).await.expect("deleted");

    let mut destroyed = app.assets.destroyed();
    destroyed.sort();
    let mut uploaded = app.assets.uploaded();
    uploaded.sort();
    assert_eq!(destroyed, uploaded);
    assert!(
        ProductRepository::new(app.pool())
            .get(id)
            .await
            .expect("query")
            .is_none()
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_deleting_a_product_removes_it_from_carts() {
    let app = TestApp::connect().await;
    let (vendor, _) = app.create_user("vendor", true).await;
    let (buyer, _) = app.create_user("buyer", false).await;
    let catalog = Catalog::new(app.pool(), app.assets.as_ref(), app.embedder.as_ref());

    let id = catalog
        .create(&vendor, &product("Desk lamp"), images(1), None)
        .await
        .expect("listed");
    let carts = CartRepository::new(app.pool());
    carts.add(&buyer.uid, id, None, 1).await.expect("add lamp");

    catalog.delete(id, &vendor.uid).await.expect("deleted");

    assert_eq!(carts.count(&buyer.uid).await.expect("count"), 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_unverified_vendor_cannot_list() {
    let app = TestApp::connect().await;
    let (vendor, _) = app.create_user("vendor", false).await;
    let catalog = Catalog::new(app.pool(), app.assets.as_ref(), app.embedder.as_ref());

    let err = catalog
        .create(&vendor, &product("Desk lamp"), images(1), None)
        .await
        .expect_err("not verified");
    assert!(matches!(err, ProductError::NotVerified));
    assert!(app.assets.uploaded().is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_only_the_owner_can_delete() {
    let app = TestApp::connect().await;
    let (vendor, _) = app.create_user("vendor", true).await;
    let (other, _) = app.create_user("other", true).await;
    let catalog = Catalog::new(app.pool(), app.assets.as_ref(), app.embedder.as_ref());

    let id = catalog
        .create(&vendor, &product("Desk lamp"), images(0), None)
        .await
        .expect("listed");

    let err = catalog.delete(id, &other.uid).await.expect_err("not owner");
    assert!(matches!(err, ProductError::Forbidden));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_more_than_five_images_is_rejected() {
    let app = TestApp::connect().await;
    let (vendor, _) = app.create_user("vendor", true).await;
    let catalog = Catalog::new(app.pool(), app.assets.as_ref(), app.embedder.as_ref());

    let err = catalog
        .create(&vendor, &product("Desk lamp"), images(6), None)
        .await
        .expect_err("too many images");
    assert!(matches!(err, ProductError::TooManyImages));
}
