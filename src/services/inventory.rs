use crate::{
    entities::{inventory_level, InventoryLevel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Stock adjustment outcome used by callers that batch adjustments inside
/// their own transaction
#[derive(Debug, Clone)]
pub struct AdjustmentOutcome {
    pub level: inventory_level::Model,
    pub old_quantity: i32,
    pub crossed_low_stock: bool,
}

/// Aggregate stock numbers for the dashboard
#[derive(Debug, Serialize)]
pub struct StockSummary {
    pub tracked_products: u64,
    pub total_units: i64,
    pub low_stock_count: u64,
    pub out_of_stock_count: u64,
}

#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    pub async fn get_level(
        &self,
        product_id: Uuid,
    ) -> Result<inventory_level::Model, ServiceError> {
        InventoryLevel::find()
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No inventory level for product {}", product_id))
            })
    }

    pub async fn list_levels(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<inventory_level::Model>, u64), ServiceError> {
        let paginator = InventoryLevel::find()
            .order_by_asc(inventory_level::Column::UpdatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// Creates the stock row for a newly added product
    pub async fn create_level_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        quantity: i32,
        low_stock_threshold: i32,
    ) -> Result<inventory_level::Model, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Initial quantity cannot be negative".to_string(),
            ));
        }

        let level = inventory_level::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            quantity: Set(quantity),
            low_stock_threshold: Set(low_stock_threshold),
            updated_at: Set(Utc::now()),
        };
        Ok(level.insert(conn).await?)
    }

    /// Overwrites quantity and threshold for a product
    #[instrument(skip(self))]
    pub async fn set_level(
        &self,
        product_id: Uuid,
        quantity: i32,
        low_stock_threshold: i32,
    ) -> Result<inventory_level::Model, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity cannot be negative".to_string(),
            ));
        }

        let level = self.get_level(product_id).await?;
        let old_quantity = level.quantity;

        let mut active: inventory_level::ActiveModel = level.into();
        active.quantity = Set(quantity);
        active.low_stock_threshold = Set(low_stock_threshold);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::InventoryAdjusted {
                product_id,
                old_quantity,
                new_quantity: updated.quantity,
                reason: "manual set".to_string(),
            })
            .await;
        self.emit_low_stock(&updated).await;

        Ok(updated)
    }

    /// Applies a signed delta to a product's stock inside `conn`.
    ///
    /// Pure database work so that checkout, POS sales, and purchase receipts
    /// can run it inside their own transaction; the caller emits events after
    /// commit. Stock never goes below zero.
    pub async fn adjust_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        delta: i32,
        reason: &str,
    ) -> Result<AdjustmentOutcome, ServiceError> {
        let level = InventoryLevel::find()
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No inventory level for product {}", product_id))
            })?;

        let old_quantity = level.quantity;
        let new_quantity = old_quantity + delta;
        if new_quantity < 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "Product {} has {} units, {} requested ({})",
                product_id, old_quantity, -delta, reason
            )));
        }

        let was_low = level.is_low_stock();
        let mut active: inventory_level::ActiveModel = level.into();
        active.quantity = Set(new_quantity);
        active.updated_at = Set(Utc::now());
        let updated = active.update(conn).await?;

        Ok(AdjustmentOutcome {
            crossed_low_stock: !was_low && updated.is_low_stock(),
            old_quantity,
            level: updated,
        })
    }

    /// Adjusts stock in its own transaction and publishes the related events
    #[instrument(skip(self))]
    pub async fn adjust(
        &self,
        product_id: Uuid,
        delta: i32,
        reason: &str,
    ) -> Result<inventory_level::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let outcome = self.adjust_on(&txn, product_id, delta, reason).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::InventoryAdjusted {
                product_id,
                old_quantity: outcome.old_quantity,
                new_quantity: outcome.level.quantity,
                reason: reason.to_string(),
            })
            .await;
        self.emit_low_stock(&outcome.level).await;

        info!(
            "Adjusted stock for product {}: {} -> {} ({})",
            product_id, outcome.old_quantity, outcome.level.quantity, reason
        );
        Ok(outcome.level)
    }

    /// Products at or below their low-stock threshold
    pub async fn low_stock(&self) -> Result<Vec<inventory_level::Model>, ServiceError> {
        let levels = InventoryLevel::find()
            .filter(
                Expr::col((
                    inventory_level::Entity,
                    inventory_level::Column::Quantity,
                ))
                .lte(Expr::col((
                    inventory_level::Entity,
                    inventory_level::Column::LowStockThreshold,
                ))),
            )
            .order_by_asc(inventory_level::Column::Quantity)
            .all(&*self.db)
            .await?;
        Ok(levels)
    }

    /// One pass over the stock table for the dashboard
    pub async fn summary(&self) -> Result<StockSummary, ServiceError> {
        let levels = InventoryLevel::find().all(&*self.db).await?;

        let mut summary = StockSummary {
            tracked_products: levels.len() as u64,
            total_units: 0,
            low_stock_count: 0,
            out_of_stock_count: 0,
        };
        for level in &levels {
            summary.total_units += level.quantity as i64;
            if level.is_out_of_stock() {
                summary.out_of_stock_count += 1;
            }
            if level.is_low_stock() {
                summary.low_stock_count += 1;
            }
        }
        Ok(summary)
    }

    pub async fn emit_adjustment_events(&self, reason: &str, outcomes: &[AdjustmentOutcome]) {
        for outcome in outcomes {
            self.event_sender
                .send_or_log(Event::InventoryAdjusted {
                    product_id: outcome.level.product_id,
                    old_quantity: outcome.old_quantity,
                    new_quantity: outcome.level.quantity,
                    reason: reason.to_string(),
                })
                .await;
            self.emit_low_stock(&outcome.level).await;
        }
    }

    async fn emit_low_stock(&self, level: &inventory_level::Model) {
        if level.is_low_stock() {
            self.event_sender
                .send_or_log(Event::LowStockDetected {
                    product_id: level.product_id,
                    quantity: level.quantity,
                    threshold: level.low_stock_threshold,
                })
                .await;
        }
    }
}
