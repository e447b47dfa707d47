mod common;

use chrono::NaiveDate;
use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::{
    entities::purchase::PurchasePaymentStatus,
    errors::ServiceError,
    services::purchasing::{CreatePurchaseInput, CreateSupplierInput, PurchaseLineInput},
};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn seed_supplier(app: &TestApp) -> Uuid {
    app.state
        .services
        .purchasing
        .create_supplier(CreateSupplierInput {
            name: "Coastal Distributors".to_string(),
            contact_info: Some("orders@coastal.example.com".to_string()),
        })
        .await
        .expect("create supplier")
        .id
}

#[tokio::test]
async fn purchase_totals_must_match_the_lines() {
    let app = TestApp::new().await;
    let supplier_id = seed_supplier(&app).await;
    let product_id = app.seed_product("Brandy", 0).await;

    let result = app
        .state
        .services
        .purchasing
        .create_purchase(CreatePurchaseInput {
            supplier_id,
            purchase_date: date(2026, 1, 5),
            invoice_number: "INV-001".to_string(),
            tax_amount: dec!(5.00),
            discount: dec!(0),
            total_amount: dec!(999.00),
            payment_status: None,
            notes: None,
            items: vec![PurchaseLineInput {
                product_id,
                quantity: 10,
                unit_cost: dec!(8.00),
            }],
        })
        .await;
    assert!(matches!(result, Err(ServiceError::ValidationError(_))));
}

#[tokio::test]
async fn receiving_a_purchase_restocks_and_stamps_delivery() {
    let app = TestApp::new().await;
    let supplier_id = seed_supplier(&app).await;
    let product_id = app.seed_product("Sherry", 2).await;

    let purchase = app
        .state
        .services
        .purchasing
        .create_purchase(CreatePurchaseInput {
            supplier_id,
            purchase_date: date(2026, 1, 5),
            invoice_number: "INV-002".to_string(),
            tax_amount: dec!(5.00),
            discount: dec!(1.00),
            // 10 x 8.00 + 5.00 - 1.00
            total_amount: dec!(84.00),
            payment_status: Some(PurchasePaymentStatus::Unpaid),
            notes: None,
            items: vec![PurchaseLineInput {
                product_id,
                quantity: 10,
                unit_cost: dec!(8.00),
            }],
        })
        .await
        .expect("create purchase");

    // Stock does not move until the goods arrive
    let level = app
        .state
        .services
        .inventory
        .get_level(product_id)
        .await
        .unwrap();
    assert_eq!(level.quantity, 2);

    let received = app
        .state
        .services
        .purchasing
        .receive_purchase(purchase.purchase.id, Some(date(2026, 1, 9)))
        .await
        .expect("receive purchase");
    assert_eq!(received.delivery_date, Some(date(2026, 1, 9)));

    let level = app
        .state
        .services
        .inventory
        .get_level(product_id)
        .await
        .unwrap();
    assert_eq!(level.quantity, 12);
}

#[tokio::test]
async fn a_purchase_needs_at_least_one_line() {
    let app = TestApp::new().await;
    let supplier_id = seed_supplier(&app).await;

    let result = app
        .state
        .services
        .purchasing
        .create_purchase(CreatePurchaseInput {
            supplier_id,
            purchase_date: date(2026, 1, 5),
            invoice_number: "INV-003".to_string(),
            tax_amount: dec!(0),
            discount: dec!(0),
            total_amount: dec!(0),
            payment_status: None,
            notes: None,
            items: vec![],
        })
        .await;
    assert!(matches!(result, Err(ServiceError::ValidationError(_))));
}

#[tokio::test]
async fn purchases_list_newest_first() {
    let app = TestApp::new().await;
    let supplier_id = seed_supplier(&app).await;
    let product_id = app.seed_product("Vermouth", 0).await;

    for (invoice, day) in [("INV-A", 3), ("INV-B", 9)] {
        app.state
            .services
            .purchasing
            .create_purchase(CreatePurchaseInput {
                supplier_id,
                purchase_date: date(2026, 2, day),
                invoice_number: invoice.to_string(),
                tax_amount: dec!(0),
                discount: dec!(0),
                total_amount: dec!(16.00),
                payment_status: None,
                notes: None,
                items: vec![PurchaseLineInput {
                    product_id,
                    quantity: 2,
                    unit_cost: dec!(8.00),
                }],
            })
            .await
            .unwrap();
    }

    let (purchases, total) = app
        .state
        .services
        .purchasing
        .list_purchases(1, 10)
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(purchases[0].invoice_number, "INV-B");
}
