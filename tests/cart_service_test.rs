mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::{
    config::AppConfig,
    errors::ServiceError,
    services::carts::{AddToCartInput, CreateCartInput},
};

#[tokio::test]
async fn adding_the_same_variant_merges_quantities() {
    let app = TestApp::new().await;
    let product_id = app.seed_product("Mineral Water", 50).await;
    let variant_id = app.seed_variant(product_id, 1000, dec!(2.50)).await;

    let carts = &app.state.services.carts;
    let cart = carts
        .create_cart(CreateCartInput {
            customer_id: None,
            currency: None,
        })
        .await
        .unwrap();

    carts
        .add_item(
            cart.id,
            AddToCartInput {
                variant_id,
                quantity: 2,
            },
        )
        .await
        .unwrap();
    let updated = carts
        .add_item(
            cart.id,
            AddToCartInput {
                variant_id,
                quantity: 3,
            },
        )
        .await
        .unwrap();

    let with_items = carts.get_cart(cart.id).await.unwrap();
    assert_eq!(with_items.items.len(), 1);
    assert_eq!(with_items.items[0].quantity, 5);
    assert_eq!(with_items.items[0].line_total, dec!(12.50));
    assert_eq!(updated.subtotal, dec!(12.50));
}

#[tokio::test]
async fn totals_apply_the_configured_tax_rate() {
    let config = AppConfig {
        default_tax_rate: 0.18,
        ..AppConfig::default()
    };
    let app = TestApp::with_config(config).await;
    let product_id = app.seed_product("Juice", 50).await;
    let variant_id = app.seed_variant(product_id, 330, dec!(10.00)).await;

    let carts = &app.state.services.carts;
    let cart = carts
        .create_cart(CreateCartInput {
            customer_id: None,
            currency: None,
        })
        .await
        .unwrap();
    let cart = carts
        .add_item(
            cart.id,
            AddToCartInput {
                variant_id,
                quantity: 2,
            },
        )
        .await
        .unwrap();

    assert_eq!(cart.subtotal, dec!(20.00));
    assert_eq!(cart.tax_total, dec!(3.60));
    assert_eq!(cart.total, dec!(23.60));
}

#[tokio::test]
async fn setting_quantity_to_zero_removes_the_line() {
    let app = TestApp::new().await;
    let product_id = app.seed_product("Soda", 50).await;
    let variant_id = app.seed_variant(product_id, 500, dec!(1.50)).await;

    let carts = &app.state.services.carts;
    let cart = carts
        .create_cart(CreateCartInput {
            customer_id: None,
            currency: None,
        })
        .await
        .unwrap();
    carts
        .add_item(
            cart.id,
            AddToCartInput {
                variant_id,
                quantity: 4,
            },
        )
        .await
        .unwrap();

    let with_items = carts.get_cart(cart.id).await.unwrap();
    let item_id = with_items.items[0].id;

    let cart = carts
        .update_item_quantity(with_items.cart.id, item_id, 0)
        .await
        .unwrap();
    assert_eq!(cart.subtotal, dec!(0));

    let with_items = carts.get_cart(cart.id).await.unwrap();
    assert!(with_items.items.is_empty());
}

#[tokio::test]
async fn items_from_another_cart_are_rejected() {
    let app = TestApp::new().await;
    let product_id = app.seed_product("Beer", 50).await;
    let variant_id = app.seed_variant(product_id, 500, dec!(3.00)).await;

    let carts = &app.state.services.carts;
    let first = carts
        .create_cart(CreateCartInput {
            customer_id: None,
            currency: None,
        })
        .await
        .unwrap();
    let second = carts
        .create_cart(CreateCartInput {
            customer_id: None,
            currency: None,
        })
        .await
        .unwrap();
    carts
        .add_item(
            first.id,
            AddToCartInput {
                variant_id,
                quantity: 1,
            },
        )
        .await
        .unwrap();
    let item_id = carts.get_cart(first.id).await.unwrap().items[0].id;

    let result = carts.update_item_quantity(second.id, item_id, 2).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn quantity_must_be_positive_on_add() {
    let app = TestApp::new().await;
    let product_id = app.seed_product("Gin", 50).await;
    let variant_id = app.seed_variant(product_id, 750, dec!(25.00)).await;

    let carts = &app.state.services.carts;
    let cart = carts
        .create_cart(CreateCartInput {
            customer_id: None,
            currency: None,
        })
        .await
        .unwrap();

    let result = carts
        .add_item(
            cart.id,
            AddToCartInput {
                variant_id,
                quantity: 0,
            },
        )
        .await;
    assert!(matches!(result, Err(ServiceError::ValidationError(_))));
}

#[tokio::test]
async fn get_or_create_reuses_the_active_cart() {
    let app = TestApp::new().await;
    let customer_id = app.seed_customer("Alice").await;

    let carts = &app.state.services.carts;
    let first = carts.get_or_create_for_customer(customer_id).await.unwrap();
    let second = carts.get_or_create_for_customer(customer_id).await.unwrap();
    assert_eq!(first.id, second.id);

    // An abandoned cart is no longer reused
    carts.abandon_cart(first.id).await.unwrap();
    let third = carts.get_or_create_for_customer(customer_id).await.unwrap();
    assert_ne!(first.id, third.id);
}
