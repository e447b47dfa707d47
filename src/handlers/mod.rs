pub mod blog;
pub mod carts;
pub mod checkout;
pub mod common;
pub mod customers;
pub mod expenses;
pub mod feedback;
pub mod finance;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod purchases;
pub mod reports;
pub mod sales;

use crate::{
    config::AppConfig,
    errors::ServiceError,
    events::EventSender,
    services::{
        BlogService, CartService, CatalogService, CheckoutService, CustomerService,
        ExpensesService, FeedbackService, FinanceService, InventoryService, MobileMoneyClient,
        OrderService, PurchasingService, ReportsService, SalesService,
    },
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Aggregate of all domain services consumed by the HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub inventory: Arc<InventoryService>,
    pub customers: Arc<CustomerService>,
    pub carts: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub sales: Arc<SalesService>,
    pub purchasing: Arc<PurchasingService>,
    pub finance: Arc<FinanceService>,
    pub expenses: Arc<ExpensesService>,
    pub blog: Arc<BlogService>,
    pub feedback: Arc<FeedbackService>,
    pub reports: Arc<ReportsService>,
    pub payments: Arc<MobileMoneyClient>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Result<Self, ServiceError> {
        let inventory = Arc::new(InventoryService::new(db.clone(), event_sender.clone()));
        let payments = Arc::new(MobileMoneyClient::new(config.mobile_money.clone())?);

        Ok(Self {
            catalog: Arc::new(CatalogService::new(
                db.clone(),
                event_sender.clone(),
                inventory.clone(),
            )),
            customers: Arc::new(CustomerService::new(db.clone(), event_sender.clone())),
            carts: Arc::new(CartService::new(
                db.clone(),
                event_sender.clone(),
                config.clone(),
            )),
            checkout: Arc::new(CheckoutService::new(
                db.clone(),
                event_sender.clone(),
                inventory.clone(),
                payments.clone(),
            )),
            orders: Arc::new(OrderService::new(
                db.clone(),
                event_sender.clone(),
                inventory.clone(),
            )),
            sales: Arc::new(SalesService::new(
                db.clone(),
                event_sender.clone(),
                inventory.clone(),
            )),
            purchasing: Arc::new(PurchasingService::new(
                db.clone(),
                event_sender.clone(),
                inventory.clone(),
            )),
            finance: Arc::new(FinanceService::new(db.clone(), event_sender.clone())),
            expenses: Arc::new(ExpensesService::new(db.clone())),
            blog: Arc::new(BlogService::new(db.clone(), event_sender.clone())),
            feedback: Arc::new(FeedbackService::new(db.clone(), event_sender)),
            reports: Arc::new(ReportsService::new(db, inventory.clone())),
            inventory,
            payments,
        })
    }
}
