mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::{
    entities::{order::OrderStatus, user::Role},
    errors::ServiceError,
    services::{
        carts::{AddToCartInput, CreateCartInput},
        checkout::CheckoutInput,
    },
};
use uuid::Uuid;

/// Checkout a three-unit cash order and return (order_id, product_id)
async fn placed_order(app: &TestApp, stock: i32) -> (Uuid, Uuid) {
    let product_id = app.seed_product("Whisky", stock).await;
    let variant_id = app.seed_variant(product_id, 750, dec!(40.00)).await;

    let cart = app
        .state
        .services
        .carts
        .create_cart(CreateCartInput {
            customer_id: None,
            currency: None,
        })
        .await
        .unwrap();
    app.state
        .services
        .carts
        .add_item(
            cart.id,
            AddToCartInput {
                variant_id,
                quantity: 3,
            },
        )
        .await
        .unwrap();
    let order = app
        .state
        .services
        .checkout
        .checkout(
            cart.id,
            CheckoutInput {
                shipping_address: "7 Hill Road".to_string(),
                payment_method: storefront_api::entities::order::PaymentMethod::Cash,
                payer_phone: None,
            },
        )
        .await
        .unwrap();
    (order.id, product_id)
}

#[tokio::test]
async fn orders_walk_the_full_lifecycle() {
    let app = TestApp::new().await;
    let (order_id, _) = placed_order(&app, 10).await;
    let staff = app.token_for(Role::Staff).await;

    let (status, body) = app
        .post_json(&format!("/api/v1/orders/{order_id}/process"), Some(&staff), json!({}))
        .await;
    assert_eq!(status, axum::http::StatusCode::OK, "body: {body}");
    assert_eq!(body["status"], "Processed");
    assert!(!body["processed_at"].is_null());

    let (status, body) = app
        .post_json(
            &format!("/api/v1/orders/{order_id}/ship"),
            Some(&staff),
            json!({"tracking_number": "TRK-1234"}),
        )
        .await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["status"], "Shipped");
    assert_eq!(body["tracking_number"], "TRK-1234");

    let (status, body) = app
        .post_json(&format!("/api/v1/orders/{order_id}/deliver"), Some(&staff), json!({}))
        .await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["status"], "Delivered");
}

#[tokio::test]
async fn skipping_a_lifecycle_step_is_rejected() {
    let app = TestApp::new().await;
    let (order_id, _) = placed_order(&app, 10).await;

    // Pending orders cannot ship or deliver
    let shipped = app.state.services.orders.mark_shipped(order_id, None).await;
    assert!(matches!(shipped, Err(ServiceError::InvalidStatus(_))));
    let delivered = app.state.services.orders.mark_delivered(order_id).await;
    assert!(matches!(delivered, Err(ServiceError::InvalidStatus(_))));
}

#[tokio::test]
async fn cancelling_restocks_the_order_lines() {
    let app = TestApp::new().await;
    let (order_id, product_id) = placed_order(&app, 10).await;

    let level = app
        .state
        .services
        .inventory
        .get_level(product_id)
        .await
        .unwrap();
    assert_eq!(level.quantity, 7);

    let order = app
        .state
        .services
        .orders
        .cancel_order(order_id)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);

    let level = app
        .state
        .services
        .inventory
        .get_level(product_id)
        .await
        .unwrap();
    assert_eq!(level.quantity, 10);
}

#[tokio::test]
async fn shipped_orders_cannot_be_cancelled() {
    let app = TestApp::new().await;
    let (order_id, _) = placed_order(&app, 10).await;
    let orders = &app.state.services.orders;

    orders.process_order(order_id).await.unwrap();
    orders
        .mark_shipped(order_id, Some("TRK-9".to_string()))
        .await
        .unwrap();

    let result = orders.cancel_order(order_id).await;
    assert!(matches!(result, Err(ServiceError::InvalidStatus(_))));
}

#[tokio::test]
async fn orders_can_be_fetched_by_number() {
    let app = TestApp::new().await;
    let (order_id, _) = placed_order(&app, 10).await;
    let staff = app.token_for(Role::Staff).await;

    let order = app.state.services.orders.get_order(order_id).await.unwrap();
    let (status, body) = app
        .get(
            &format!("/api/v1/orders/by-number/{}", order.order.order_number),
            Some(&staff),
        )
        .await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["order"]["id"], order.order.id.to_string());
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn status_filter_narrows_the_listing() {
    let app = TestApp::new().await;
    let (first, _) = placed_order(&app, 10).await;
    let (_second, _) = placed_order(&app, 10).await;
    app.state.services.orders.process_order(first).await.unwrap();

    let staff = app.token_for(Role::Staff).await;
    let (status, body) = app
        .get("/api/v1/orders?status=processed", Some(&staff))
        .await;
    assert_eq!(status, axum::http::StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], first.to_string());

    let (status, _) = app.get("/api/v1/orders?status=bogus", Some(&staff)).await;
    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
}
