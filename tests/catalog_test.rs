mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::{
    entities::product::ProductStatus,
    errors::ServiceError,
    services::catalog::{
        AddImageInput, CreateCategoryInput, CreateProductInput, CreateVariantInput, ProductFilter,
    },
};

#[tokio::test]
async fn creating_a_product_also_creates_its_stock_row() {
    let app = TestApp::new().await;
    let product_id = app.seed_product("Dry Gin", 25).await;

    let level = app
        .state
        .services
        .inventory
        .get_level(product_id)
        .await
        .expect("inventory level exists");
    assert_eq!(level.quantity, 25);
}

#[tokio::test]
async fn duplicate_variant_skus_are_rejected() {
    let app = TestApp::new().await;
    let product_id = app.seed_product("Tonic Water", 10).await;
    let catalog = &app.state.services.catalog;

    catalog
        .add_variant(
            product_id,
            CreateVariantInput {
                sku: "TONIC-500".to_string(),
                volume_ml: 500,
                price: dec!(1.80),
                position: None,
            },
        )
        .await
        .unwrap();

    let duplicate = catalog
        .add_variant(
            product_id,
            CreateVariantInput {
                sku: "TONIC-500".to_string(),
                volume_ml: 1000,
                price: dec!(3.20),
                position: None,
            },
        )
        .await;
    assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn at_most_one_image_is_the_default() {
    let app = TestApp::new().await;
    let product_id = app.seed_product("Rosé", 10).await;
    let catalog = &app.state.services.catalog;

    let first = catalog
        .add_image(
            product_id,
            AddImageInput {
                url: "https://cdn.example.com/rose-1.jpg".to_string(),
                alt_text: None,
                is_default: true,
            },
        )
        .await
        .unwrap();
    let second = catalog
        .add_image(
            product_id,
            AddImageInput {
                url: "https://cdn.example.com/rose-2.jpg".to_string(),
                alt_text: None,
                is_default: false,
            },
        )
        .await
        .unwrap();

    catalog
        .set_default_image(product_id, second.id)
        .await
        .unwrap();

    let detail = catalog.get_product(product_id).await.unwrap();
    let defaults: Vec<_> = detail.images.iter().filter(|i| i.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, second.id);
    assert!(detail
        .images
        .iter()
        .find(|i| i.id == first.id)
        .map(|i| !i.is_default)
        .unwrap());
}

#[tokio::test]
async fn deleting_a_category_leaves_products_uncategorized() {
    let app = TestApp::new().await;
    let catalog = &app.state.services.catalog;

    let category = catalog
        .create_category(CreateCategoryInput {
            name: "Spirits".to_string(),
            description: None,
        })
        .await
        .unwrap();
    let product = catalog
        .create_product(CreateProductInput {
            name: "Aged Rum".to_string(),
            description: "Seven years".to_string(),
            status: None,
            category_id: Some(category.id),
            cost: None,
            initial_stock: Some(5),
            low_stock_threshold: None,
        })
        .await
        .unwrap();
    assert_eq!(product.category_id, Some(category.id));

    catalog.delete_category(category.id).await.unwrap();

    let detail = catalog.get_product(product.id).await.unwrap();
    assert_eq!(detail.product.category_id, None);
}

#[tokio::test]
async fn listing_filters_compose() {
    let app = TestApp::new().await;
    let catalog = &app.state.services.catalog;

    let cheap = app.seed_product("House White", 10).await;
    app.seed_variant(cheap, 750, dec!(6.00)).await;
    let pricey = app.seed_product("Vintage Red", 10).await;
    app.seed_variant(pricey, 750, dec!(45.00)).await;

    let (hits, total) = catalog
        .list_products(
            ProductFilter {
                status: Some(ProductStatus::Active),
                category_id: None,
                min_price: Some(dec!(20.00)),
                max_price: None,
                search: None,
            },
            1,
            10,
        )
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(hits[0].id, pricey);

    let (hits, _) = catalog
        .list_products(
            ProductFilter {
                search: Some("white".to_string()),
                ..ProductFilter::default()
            },
            1,
            10,
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, cheap);
}
