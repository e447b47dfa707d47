mod common;

use chrono::{TimeZone, Utc};
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use storefront_api::entities::{sale, sale_item};
use storefront_api::services::expenses::CreateExpenseInput;
use uuid::Uuid;

/// Inserts a bare sale row dated inside the given month
async fn sale_in_month(app: &TestApp, year: i32, month: u32, grand_total: Decimal) -> Uuid {
    let id = Uuid::new_v4();
    let stamp = Utc.with_ymd_and_hms(year, month, 15, 12, 0, 0).unwrap();
    let model = sale::ActiveModel {
        id: Set(id),
        customer_id: Set(None),
        cashier_id: Set(None),
        sub_total: Set(grand_total),
        tax_percentage: Set(dec!(0)),
        tax_amount: Set(dec!(0)),
        grand_total: Set(grand_total),
        amount_paid: Set(grand_total),
        amount_change: Set(dec!(0)),
        created_at: Set(stamp),
    };
    model.insert(&*app.state.db).await.expect("insert sale");
    id
}

async fn sale_line(app: &TestApp, sale_id: Uuid, product_id: Uuid, quantity: i32) {
    let model = sale_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        sale_id: Set(sale_id),
        product_id: Set(product_id),
        variant_id: Set(None),
        price: Set(dec!(2.00)),
        quantity: Set(quantity),
        total: Set(dec!(2.00) * Decimal::from(quantity)),
        created_at: Set(Utc::now()),
    };
    model.insert(&*app.state.db).await.expect("insert sale line");
}

#[tokio::test]
async fn earnings_fall_into_twelve_monthly_buckets() {
    let app = TestApp::new().await;
    sale_in_month(&app, 2026, 1, dec!(100.00)).await;
    sale_in_month(&app, 2026, 1, dec!(50.00)).await;
    sale_in_month(&app, 2026, 6, dec!(75.00)).await;
    // A different year must not leak in
    sale_in_month(&app, 2025, 12, dec!(999.00)).await;

    let earnings = app
        .state
        .services
        .reports
        .monthly_earnings(2026)
        .await
        .unwrap();

    assert_eq!(earnings.monthly.len(), 12);
    assert_eq!(earnings.monthly[0], dec!(150.00));
    assert_eq!(earnings.monthly[5], dec!(75.00));
    assert_eq!(earnings.annual_total, dec!(225.00));
    assert_eq!(earnings.monthly_average, dec!(18.75));
}

#[tokio::test]
async fn top_products_rank_by_units_sold() {
    let app = TestApp::new().await;
    let brandy = app.seed_product("Brandy", 100).await;
    let whisky = app.seed_product("Whisky", 100).await;
    let gin = app.seed_product("Gin", 100).await;

    let sale_id = sale_in_month(&app, 2026, 3, dec!(60.00)).await;
    sale_line(&app, sale_id, brandy, 3).await;
    sale_line(&app, sale_id, whisky, 10).await;
    sale_line(&app, sale_id, gin, 7).await;
    let second = sale_in_month(&app, 2026, 4, dec!(20.00)).await;
    sale_line(&app, second, brandy, 5).await;

    let top = app
        .state
        .services
        .reports
        .top_selling_products(2)
        .await
        .unwrap();

    assert_eq!(top.len(), 2);
    assert_eq!(top[0].product_id, whisky);
    assert_eq!(top[0].units_sold, 10);
    assert_eq!(top[1].product_id, brandy);
    assert_eq!(top[1].units_sold, 8);
    assert_eq!(top[1].name, "Brandy");
}

#[tokio::test]
async fn dashboard_combines_earnings_top_sellers_and_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("Cognac", 9).await;
    let sale_id = sale_in_month(&app, 2026, 2, dec!(30.00)).await;
    sale_line(&app, sale_id, product, 2).await;

    let dashboard = app.state.services.reports.dashboard(2026).await.unwrap();
    assert_eq!(dashboard.earnings.annual_total, dec!(30.00));
    assert_eq!(dashboard.top_products.len(), 1);
    assert_eq!(dashboard.stock.tracked_products, 1);
    assert_eq!(dashboard.stock.total_units, 9);
}

#[tokio::test]
async fn expense_totals_bucket_by_month() {
    let app = TestApp::new().await;
    let expenses = &app.state.services.expenses;

    for (month, amount) in [(2u32, dec!(120.00)), (2, dec!(30.00)), (9, dec!(55.00))] {
        expenses
            .create_expense(CreateExpenseInput {
                incurred_at: Some(Utc.with_ymd_and_hms(2026, month, 10, 9, 0, 0).unwrap()),
                description: "Rent and utilities".to_string(),
                amount,
            })
            .await
            .unwrap();
    }

    let totals = expenses.monthly_totals(2026).await.unwrap();
    assert_eq!(totals.monthly.len(), 12);
    assert_eq!(totals.monthly[1], dec!(150.00));
    assert_eq!(totals.monthly[8], dec!(55.00));
    assert_eq!(totals.monthly[0], dec!(0));
}

#[tokio::test]
async fn negative_or_empty_expenses_are_rejected() {
    let app = TestApp::new().await;
    let expenses = &app.state.services.expenses;

    let bad_amount = expenses
        .create_expense(CreateExpenseInput {
            incurred_at: None,
            description: "Rent".to_string(),
            amount: dec!(-10.00),
        })
        .await;
    assert!(bad_amount.is_err());

    let blank = expenses
        .create_expense(CreateExpenseInput {
            incurred_at: None,
            description: "   ".to_string(),
            amount: dec!(10.00),
        })
        .await;
    assert!(blank.is_err());
}
