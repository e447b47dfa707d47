mod common;

use common::TestApp;
use serde_json::json;
use storefront_api::{entities::user::Role, errors::ServiceError};

#[tokio::test]
async fn adjustments_apply_signed_deltas() {
    let app = TestApp::new().await;
    let product_id = app.seed_product("Rum", 20).await;
    let inventory = &app.state.services.inventory;

    let level = inventory.adjust(product_id, -6, "breakage").await.unwrap();
    assert_eq!(level.quantity, 14);

    let level = inventory.adjust(product_id, 10, "restock").await.unwrap();
    assert_eq!(level.quantity, 24);
}

#[tokio::test]
async fn stock_never_goes_below_zero() {
    let app = TestApp::new().await;
    let product_id = app.seed_product("Vodka", 3).await;

    let result = app
        .state
        .services
        .inventory
        .adjust(product_id, -5, "oversold")
        .await;
    assert!(matches!(result, Err(ServiceError::InsufficientStock(_))));

    // HTTP surface maps the failure to 422
    let manager = app.token_for(Role::Manager).await;
    let (status, _) = app
        .post_json(
            &format!("/api/v1/inventory/{product_id}/adjust"),
            Some(&manager),
            json!({"delta": -5, "reason": "oversold"}),
        )
        .await;
    assert_eq!(status, axum::http::StatusCode::UNPROCESSABLE_ENTITY);

    let level = app
        .state
        .services
        .inventory
        .get_level(product_id)
        .await
        .unwrap();
    assert_eq!(level.quantity, 3);
}

#[tokio::test]
async fn low_stock_lists_products_at_or_below_threshold() {
    let app = TestApp::new().await;
    // seed_product uses a threshold of 5
    let low = app.seed_product("Tonic", 4).await;
    let _plenty = app.seed_product("Soda Water", 40).await;

    let levels = app.state.services.inventory.low_stock().await.unwrap();
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0].product_id, low);
}

#[tokio::test]
async fn set_level_overwrites_quantity_and_threshold() {
    let app = TestApp::new().await;
    let product_id = app.seed_product("Bitters", 10).await;

    let level = app
        .state
        .services
        .inventory
        .set_level(product_id, 2, 8)
        .await
        .unwrap();
    assert_eq!(level.quantity, 2);
    assert_eq!(level.low_stock_threshold, 8);
    assert!(level.is_low_stock());

    let result = app.state.services.inventory.set_level(product_id, -1, 8).await;
    assert!(matches!(result, Err(ServiceError::ValidationError(_))));
}

#[tokio::test]
async fn summary_counts_the_whole_stock_table() {
    let app = TestApp::new().await;
    app.seed_product("Gin", 12).await;
    app.seed_product("Wine", 0).await;
    app.seed_product("Port", 3).await;

    let summary = app.state.services.inventory.summary().await.unwrap();
    assert_eq!(summary.tracked_products, 3);
    assert_eq!(summary.total_units, 15);
    assert_eq!(summary.out_of_stock_count, 1);
    // Wine (0) and Port (3) sit at or below the threshold of 5
    assert_eq!(summary.low_stock_count, 2);
}

#[tokio::test]
async fn zero_page_params_fall_back_to_sane_values() {
    let app = TestApp::new().await;
    app.seed_product("Rum", 20).await;
    let staff = app.token_for(Role::Staff).await;

    let (status, body) = app
        .get("/api/v1/inventory?page=0&per_page=0", Some(&staff))
        .await;
    assert_eq!(status, axum::http::StatusCode::OK, "body: {body}");
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["per_page"], 1);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn inventory_reads_require_staff() {
    let app = TestApp::new().await;
    let guest = app.token_for(Role::Guest).await;

    let (status, _) = app.get("/api/v1/inventory", None).await;
    assert_eq!(status, axum::http::StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/v1/inventory", Some(&guest)).await;
    assert_eq!(status, axum::http::StatusCode::FORBIDDEN);
}
