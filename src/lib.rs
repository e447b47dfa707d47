//! Storefront API Library
//!
//! This crate provides the core functionality for the storefront API:
//! catalog, carts and checkout, orders, inventory, POS sales, purchasing,
//! a double-entry finance ledger, and a blog module.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::RoleRouterExt;
use crate::entities::user::Role;

// App state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<config::AppConfig>,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Response envelope used by the status and health endpoints
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// The full `/api/v1` surface.
///
/// Routes are grouped by the minimum role they require and merged; the
/// public storefront surface (catalog and blog reads, feedback submission)
/// carries no guard at all.
pub fn api_v1_routes() -> Router<AppState> {
    // Public storefront surface
    let public = Router::new()
        .route("/products", get(handlers::products::list_products))
        .route("/products/:id", get(handlers::products::get_product))
        .route("/categories", get(handlers::products::list_categories))
        .route("/blog/posts", get(handlers::blog::list_published))
        .route("/blog/posts/:slug", get(handlers::blog::get_post_by_slug))
        .route(
            "/blog/posts/:slug/comments",
            post(handlers::blog::add_comment),
        )
        .route("/blog/categories", get(handlers::blog::list_categories))
        .route("/blog/tags", get(handlers::blog::list_tags))
        .route("/feedback", post(handlers::feedback::submit));

    // Carts and checkout require a signed-in user of any role
    let shopping = Router::new()
        .route("/carts", post(handlers::carts::create_cart))
        .route("/carts/:id", get(handlers::carts::get_cart))
        .route(
            "/carts/customer/:customer_id",
            get(handlers::carts::cart_for_customer),
        )
        .route("/carts/:id/items", post(handlers::carts::add_item))
        .route(
            "/carts/:id/items/:item_id",
            put(handlers::carts::update_item).delete(handlers::carts::remove_item),
        )
        .route("/carts/:id/clear", post(handlers::carts::clear_cart))
        .route("/carts/:id/abandon", post(handlers::carts::abandon_cart))
        .route("/checkout/:cart_id", post(handlers::checkout::checkout_cart))
        .route(
            "/checkout/orders/:order_id/confirm",
            post(handlers::checkout::confirm_payment),
        )
        .with_min_role(Role::Guest);

    // Back-office reads and day-to-day operations
    let staff = Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route(
            "/orders/by-number/:order_number",
            get(handlers::orders::get_order_by_number),
        )
        .route(
            "/orders/customer/:customer_id",
            get(handlers::orders::list_for_customer),
        )
        .route("/orders/:id/process", post(handlers::orders::process_order))
        .route("/orders/:id/ship", post(handlers::orders::mark_shipped))
        .route("/orders/:id/deliver", post(handlers::orders::mark_delivered))
        .route("/inventory", get(handlers::inventory::list_levels))
        .route("/inventory/low-stock", get(handlers::inventory::low_stock))
        .route("/inventory/summary", get(handlers::inventory::summary))
        .route(
            "/inventory/:product_id",
            get(handlers::inventory::get_level),
        )
        .route("/customers", get(handlers::customers::list_customers))
        .route("/customers/lookup", get(handlers::customers::lookup))
        .route("/customers/:id", get(handlers::customers::get_customer))
        .route("/customers", post(handlers::customers::create_customer))
        .route("/customers/:id", put(handlers::customers::update_customer))
        .route("/sales", post(handlers::sales::create_sale))
        .route("/sales", get(handlers::sales::list_sales))
        .route("/sales/:id", get(handlers::sales::get_sale))
        .route(
            "/sales/customer/:customer_id",
            get(handlers::sales::list_for_customer),
        )
        .route("/suppliers", get(handlers::purchases::list_suppliers))
        .route("/purchases", get(handlers::purchases::list_purchases))
        .route("/purchases/:id", get(handlers::purchases::get_purchase))
        .route("/finance/accounts", get(handlers::finance::list_accounts))
        .route(
            "/finance/accounts/grouped",
            get(handlers::finance::accounts_by_type),
        )
        .route("/finance/accounts/:id", get(handlers::finance::get_account))
        .route(
            "/finance/accounts/:id/ledger",
            get(handlers::finance::ledger_report),
        )
        .route(
            "/finance/balances",
            get(handlers::finance::account_balances),
        )
        .route("/expenses", get(handlers::expenses::list_expenses))
        .route(
            "/expenses/monthly",
            get(handlers::expenses::monthly_totals),
        )
        .route("/feedback", get(handlers::feedback::list))
        .route(
            "/feedback/:id/review",
            post(handlers::feedback::mark_reviewed),
        )
        .with_min_role(Role::Staff);

    // Catalog, purchasing, finance, and blog writes plus cancellations
    let manager = Router::new()
        .route("/products", post(handlers::products::create_product))
        .route("/products/:id", put(handlers::products::update_product))
        .route(
            "/products/:id/variants",
            post(handlers::products::add_variant),
        )
        .route("/variants/:id", put(handlers::products::update_variant))
        .route("/products/:id/images", post(handlers::products::add_image))
        .route(
            "/products/:id/images/:image_id/default",
            put(handlers::products::set_default_image),
        )
        .route("/categories", post(handlers::products::create_category))
        .route("/categories/:id", put(handlers::products::update_category))
        .route("/orders/:id/cancel", post(handlers::orders::cancel_order))
        .route(
            "/inventory/:product_id/adjust",
            post(handlers::inventory::adjust),
        )
        .route(
            "/inventory/:product_id",
            put(handlers::inventory::set_level),
        )
        .route("/suppliers", post(handlers::purchases::create_supplier))
        .route("/purchases", post(handlers::purchases::create_purchase))
        .route(
            "/purchases/:id/receive",
            post(handlers::purchases::receive_purchase),
        )
        .route("/finance/accounts", post(handlers::finance::create_account))
        .route(
            "/finance/accounts/:id",
            put(handlers::finance::update_account),
        )
        .route(
            "/finance/transactions",
            post(handlers::finance::record_transaction),
        )
        .route(
            "/finance/transactions/double-entry",
            post(handlers::finance::record_double_entry),
        )
        .route("/expenses", post(handlers::expenses::create_expense))
        .route("/blog/posts", post(handlers::blog::create_post))
        .route("/blog/posts/:slug", put(handlers::blog::update_post))
        .route(
            "/blog/posts/:slug/publish",
            post(handlers::blog::publish_post),
        )
        .route(
            "/blog/posts/:slug/unpublish",
            post(handlers::blog::unpublish_post),
        )
        .route("/blog/categories", post(handlers::blog::create_category))
        .route("/blog/tags", post(handlers::blog::create_tag))
        .route("/reports/dashboard", get(handlers::reports::dashboard))
        .route(
            "/reports/earnings",
            get(handlers::reports::monthly_earnings),
        )
        .route(
            "/reports/top-products",
            get(handlers::reports::top_products),
        )
        .with_min_role(Role::Manager);

    // Destructive operations
    let admin = Router::new()
        .route("/products/:id", delete(handlers::products::delete_product))
        .route("/variants/:id", delete(handlers::products::remove_variant))
        .route("/images/:id", delete(handlers::products::remove_image))
        .route(
            "/categories/:id",
            delete(handlers::products::delete_category),
        )
        .route(
            "/customers/:id",
            delete(handlers::customers::delete_customer),
        )
        .route(
            "/finance/accounts/:id",
            delete(handlers::finance::delete_account),
        )
        .route("/blog/posts/:slug", delete(handlers::blog::delete_post))
        .with_min_role(Role::Administrator);

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(public)
        .merge(shopping)
        .merge(staff)
        .merge(manager)
        .merge(admin)
}

async fn api_status() -> Json<ApiResponse<Value>> {
    let status_data = json!({
        "status": "ok",
        "service": "storefront-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    });
    Json(ApiResponse::success(status_data))
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let db_healthy = db::ping(&state.db).await;

    let health_data = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "checks": {
            "database": if db_healthy { "healthy" } else { "unhealthy" },
        },
        "timestamp": Utc::now().to_rfc3339(),
    });
    Json(ApiResponse::success(health_data))
}
