use crate::{
    entities::{
        cart::{self, CartStatus},
        order::{self, OrderStatus, PaymentMethod, PaymentStatus},
        order_item, product_variant, Cart, CartItem, Product, ProductVariant,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        inventory::{AdjustmentOutcome, InventoryService},
        payments::{CollectionStatus, MobileMoneyClient},
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Converts carts into immutable orders.
///
/// The conversion is transactional: order creation, line snapshotting, stock
/// decrements, and the cart status flip either all commit or none do. The
/// mobile-money collection request happens after commit as a single attempt;
/// a gateway failure marks the order's payment as failed and surfaces the
/// error, it never undoes the order.
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    inventory: Arc<InventoryService>,
    payments: Arc<MobileMoneyClient>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        inventory: Arc<InventoryService>,
        payments: Arc<MobileMoneyClient>,
    ) -> Self {
        Self {
            db,
            event_sender,
            inventory,
            payments,
        }
    }

    /// Converts the cart into an order.
    ///
    /// Fails with `InvalidOperation` when the cart is empty or not active and
    /// with `InsufficientStock` when any line cannot be covered; in both
    /// cases nothing is written. When the payment method is mobile money, a
    /// payer phone number is required and one collection request is issued
    /// after the order is committed.
    #[instrument(skip(self, input))]
    pub async fn checkout(
        &self,
        cart_id: Uuid,
        input: CheckoutInput,
    ) -> Result<order::Model, ServiceError> {
        if input.payment_method == PaymentMethod::MobileMoney && input.payer_phone.is_none() {
            return Err(ServiceError::ValidationError(
                "A payer phone number is required for mobile money".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let cart = Cart::find_by_id(cart_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        if cart.status != CartStatus::Active {
            return Err(ServiceError::InvalidOperation(
                "Cart is not active".to_string(),
            ));
        }

        let items = cart.find_related(CartItem).all(&txn).await?;
        if items.is_empty() {
            return Err(ServiceError::InvalidOperation("Cart is empty".to_string()));
        }

        // Snapshot names and volumes for the order lines
        let variant_ids: Vec<Uuid> = items.iter().map(|i| i.variant_id).collect();
        let variants: HashMap<Uuid, product_variant::Model> = ProductVariant::find()
            .filter(product_variant::Column::Id.is_in(variant_ids))
            .all(&txn)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products: HashMap<Uuid, String> = Product::find()
            .filter(crate::entities::product::Column::Id.is_in(product_ids))
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(format!(
                "ORD-{}",
                order_id.simple().to_string()[..8].to_uppercase()
            )),
            customer_id: Set(cart.customer_id),
            cart_id: Set(Some(cart_id)),
            status: Set(OrderStatus::Pending),
            order_date: Set(now),
            currency: Set(cart.currency.clone()),
            subtotal: Set(cart.subtotal),
            tax_total: Set(cart.tax_total),
            total_amount: Set(cart.total),
            payment_method: Set(Some(input.payment_method)),
            payment_status: Set(PaymentStatus::Unpaid),
            payment_reference: Set(None),
            shipping_address: Set(Some(input.shipping_address)),
            tracking_number: Set(None),
            processed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            version: Set(1),
        };
        let order = order.insert(&txn).await?;

        let mut adjustments: Vec<AdjustmentOutcome> = Vec::with_capacity(items.len());
        for item in &items {
            let variant = variants.get(&item.variant_id).ok_or_else(|| {
                ServiceError::NotFound(format!("Variant {} no longer exists", item.variant_id))
            })?;
            let name = products
                .get(&item.product_id)
                .cloned()
                .unwrap_or_else(|| "Unknown product".to_string());

            let line = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                variant_id: Set(item.variant_id),
                name: Set(name),
                volume_ml: Set(variant.volume_ml),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                line_total: Set(item.line_total),
                created_at: Set(now),
            };
            line.insert(&txn).await?;

            let outcome = self
                .inventory
                .adjust_on(&txn, item.product_id, -item.quantity, "checkout")
                .await?;
            adjustments.push(outcome);
        }

        let mut cart_update: cart::ActiveModel = cart.into();
        cart_update.status = Set(CartStatus::Converted);
        cart_update.updated_at = Set(now);
        cart_update.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;
        self.event_sender
            .send_or_log(Event::CheckoutCompleted { cart_id, order_id })
            .await;
        self.inventory
            .emit_adjustment_events("checkout", &adjustments)
            .await;

        info!(
            "Checkout completed: order {} created from cart {}",
            order_id, cart_id
        );

        if input.payment_method == PaymentMethod::MobileMoney {
            let phone = input.payer_phone.as_deref().unwrap_or_default();
            return self.collect_payment(order, phone).await;
        }

        Ok(order)
    }

    /// Issues the single collection request for a freshly created order.
    /// A gateway failure marks the order failed and bubbles the error up.
    async fn collect_payment(
        &self,
        order: order::Model,
        payer_phone: &str,
    ) -> Result<order::Model, ServiceError> {
        let reference = Uuid::new_v4();
        let request = self
            .payments
            .request_collection(reference, payer_phone, order.total_amount, &order.order_number)
            .await;

        match request {
            Ok(()) => {
                let order_id = order.id;
                let mut active: order::ActiveModel = order.into();
                active.payment_status = Set(PaymentStatus::Pending);
                active.payment_reference = Set(Some(reference));
                active.updated_at = Set(Utc::now());
                let updated = active.update(&*self.db).await?;

                self.event_sender
                    .send_or_log(Event::PaymentRequested {
                        order_id,
                        reference,
                    })
                    .await;
                Ok(updated)
            }
            Err(err) => {
                warn!("Collection request for order {} failed: {}", order.id, err);
                let order_id = order.id;
                let mut active: order::ActiveModel = order.into();
                active.payment_status = Set(PaymentStatus::Failed);
                active.updated_at = Set(Utc::now());
                active.update(&*self.db).await?;

                self.event_sender
                    .send_or_log(Event::PaymentFailed(order_id))
                    .await;
                Err(err)
            }
        }
    }

    /// Polls the provider once and records the outcome on the order
    #[instrument(skip(self))]
    pub async fn confirm_payment(&self, order_id: Uuid) -> Result<PaymentCheck, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let reference = order.payment_reference.ok_or_else(|| {
            ServiceError::InvalidOperation(
                "Order has no pending payment to confirm".to_string(),
            )
        })?;

        let status = self.payments.collection_status(reference).await?;
        let order = match status {
            CollectionStatus::Successful => {
                let mut active: order::ActiveModel = order.into();
                active.payment_status = Set(PaymentStatus::Paid);
                active.updated_at = Set(Utc::now());
                let updated = active.update(&*self.db).await?;
                self.event_sender
                    .send_or_log(Event::PaymentConfirmed(order_id))
                    .await;
                updated
            }
            CollectionStatus::Failed => {
                let mut active: order::ActiveModel = order.into();
                active.payment_status = Set(PaymentStatus::Failed);
                active.updated_at = Set(Utc::now());
                let updated = active.update(&*self.db).await?;
                self.event_sender
                    .send_or_log(Event::PaymentFailed(order_id))
                    .await;
                updated
            }
            CollectionStatus::Pending => order,
        };

        Ok(PaymentCheck { status, order })
    }
}

/// Input for converting a cart into an order
#[derive(Debug, Deserialize)]
pub struct CheckoutInput {
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    pub payer_phone: Option<String>,
}

/// Result of a payment confirmation poll
#[derive(Debug, Serialize)]
pub struct PaymentCheck {
    pub status: CollectionStatus,
    pub order: order::Model,
}
