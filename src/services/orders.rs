use crate::{
    entities::{
        order::{self, OrderStatus},
        order_item, Order, OrderItem,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::{AdjustmentOutcome, InventoryService},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Order lifecycle service. Orders are created by checkout; from there they
/// move along Pending -> Processed -> Shipped -> Delivered, with cancellation
/// possible until shipping. Cancelling restocks every line.
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    inventory: Arc<InventoryService>,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        inventory: Arc<InventoryService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            inventory,
        }
    }

    pub async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let mut query = Order::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(order::Column::OrderDate)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let items = order.find_related(OrderItem).all(&*self.db).await?;
        Ok(OrderWithItems { order, items })
    }

    pub async fn get_order_by_number(
        &self,
        order_number: &str,
    ) -> Result<OrderWithItems, ServiceError> {
        let order = Order::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} not found", order_number))
            })?;
        let items = order.find_related(OrderItem).all(&*self.db).await?;
        Ok(OrderWithItems { order, items })
    }

    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::OrderDate)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// Marks a pending order as processed and stamps the processing time
    #[instrument(skip(self))]
    pub async fn process_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let order = self.load(order_id).await?;
        self.ensure_transition(&order, OrderStatus::Processed)?;

        let old_status = order.status;
        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Processed);
        active.processed_at = Set(Some(Utc::now()));
        let updated = self.touch_and_update(active).await?;

        self.emit_status_change(order_id, old_status, OrderStatus::Processed)
            .await;
        Ok(updated)
    }

    /// Marks a processed order as shipped with its tracking number
    #[instrument(skip(self))]
    pub async fn mark_shipped(
        &self,
        order_id: Uuid,
        tracking_number: Option<String>,
    ) -> Result<order::Model, ServiceError> {
        let order = self.load(order_id).await?;
        self.ensure_transition(&order, OrderStatus::Shipped)?;

        let old_status = order.status;
        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Shipped);
        if let Some(tracking) = tracking_number {
            active.tracking_number = Set(Some(tracking));
        }
        let updated = self.touch_and_update(active).await?;

        self.emit_status_change(order_id, old_status, OrderStatus::Shipped)
            .await;
        Ok(updated)
    }

    /// Marks a shipped order as delivered
    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let order = self.load(order_id).await?;
        self.ensure_transition(&order, OrderStatus::Delivered)?;

        let old_status = order.status;
        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Delivered);
        let updated = self.touch_and_update(active).await?;

        self.emit_status_change(order_id, old_status, OrderStatus::Delivered)
            .await;
        Ok(updated)
    }

    /// Cancels an order that has not shipped yet and restocks its lines
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let order = self.load(order_id).await?;
        self.ensure_transition(&order, OrderStatus::Cancelled)?;
        let old_status = order.status;

        let txn = self.db.begin().await?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;

        let mut adjustments: Vec<AdjustmentOutcome> = Vec::with_capacity(items.len());
        for item in &items {
            let outcome = self
                .inventory
                .adjust_on(&txn, item.product_id, item.quantity, "order cancelled")
                .await?;
            adjustments.push(outcome);
        }

        let version = order.version;
        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Cancelled);
        active.version = Set(version + 1);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        self.inventory
            .emit_adjustment_events("order cancelled", &adjustments)
            .await;
        self.event_sender
            .send_or_log(Event::OrderCancelled(order_id))
            .await;
        self.emit_status_change(order_id, old_status, OrderStatus::Cancelled)
            .await;

        info!("Cancelled order {} and restocked {} lines", order_id, items.len());
        Ok(updated)
    }

    async fn load(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    fn ensure_transition(
        &self,
        order: &order::Model,
        next: OrderStatus,
    ) -> Result<(), ServiceError> {
        if !order.status.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "Order {} cannot move from {:?} to {:?}",
                order.order_number, order.status, next
            )));
        }
        Ok(())
    }

    async fn touch_and_update(
        &self,
        mut active: order::ActiveModel,
    ) -> Result<order::Model, ServiceError> {
        if let sea_orm::ActiveValue::Unchanged(version) = active.version {
            active.version = Set(version + 1);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    async fn emit_status_change(&self, order_id: Uuid, old: OrderStatus, new: OrderStatus) {
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: format!("{:?}", old),
                new_status: format!("{:?}", new),
            })
            .await;
    }
}

/// Order with its snapshotted lines
#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}
