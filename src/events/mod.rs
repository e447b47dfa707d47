use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    /// Event delivery is best-effort; domain writes never roll back on it.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("Dropping event: {}", e);
        }
    }
}

// The various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    VariantCreated { product_id: Uuid, variant_id: Uuid },
    DefaultImageChanged { product_id: Uuid, image_id: Uuid },

    // Cart events
    CartCreated(Uuid),
    CartUpdated(Uuid),
    CartItemAdded { cart_id: Uuid, variant_id: Uuid },
    CartItemRemoved { cart_id: Uuid, item_id: Uuid },
    CartCleared(Uuid),

    // Checkout and order events
    CheckoutCompleted { cart_id: Uuid, order_id: Uuid },
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderCancelled(Uuid),

    // Payment events
    PaymentRequested { order_id: Uuid, reference: Uuid },
    PaymentConfirmed(Uuid),
    PaymentFailed(Uuid),

    // Inventory events
    InventoryAdjusted {
        product_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
        reason: String,
    },
    LowStockDetected {
        product_id: Uuid,
        quantity: i32,
        threshold: i32,
    },

    // POS events
    SaleRecorded { sale_id: Uuid, grand_total: Decimal },

    // Procurement events
    PurchaseCreated(Uuid),
    PurchaseReceived(Uuid),

    // Finance events
    AccountCreated(Uuid),
    TransactionPosted { account_id: Uuid, amount: Decimal },
    DoubleEntryPosted {
        debit_account_id: Uuid,
        credit_account_id: Uuid,
        amount: Decimal,
    },

    // Blog events
    PostPublished(Uuid),
    CommentAdded { post_id: Uuid, comment_id: Uuid },

    // Customer and feedback events
    CustomerCreated(Uuid),
    FeedbackReceived(Uuid),

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

impl Event {
    /// Create a generic event with string data
    pub fn with_data(data: String) -> Self {
        Event::Generic {
            message: data,
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }
}

/// Consumes the event channel. Most events are only logged; stock and payment
/// alerts get a dedicated warning so operators can act on them.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::LowStockDetected {
                product_id,
                quantity,
                threshold,
            } => {
                warn!(
                    "Low stock alert: product {} at {} units (threshold {})",
                    product_id, quantity, threshold
                );
            }
            Event::PaymentFailed(order_id) => {
                warn!("Payment failed for order {}", order_id);
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    "Order {} moved from {} to {}",
                    order_id, old_status, new_status
                );
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event channel closed; processing loop terminated");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::OrderCreated(Uuid::new_v4()))
            .await
            .expect("send should succeed");

        assert!(matches!(rx.recv().await, Some(Event::OrderCreated(_))));
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic even though the receiver is gone
        sender.send_or_log(Event::CartCreated(Uuid::new_v4())).await;
    }

    #[test]
    fn generic_event_carries_message() {
        let event = Event::with_data("reindex".to_string());
        match event {
            Event::Generic { message, .. } => assert_eq!(message, "reindex"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
