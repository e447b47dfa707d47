use crate::{
    entities::{
        purchase::{self, PurchasePaymentStatus},
        purchase_item, supplier, Product, Purchase, PurchaseItem, Supplier,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::{AdjustmentOutcome, InventoryService},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Supplier purchases: ordering stock and receiving it into inventory.
pub struct PurchasingService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    inventory: Arc<InventoryService>,
}

impl PurchasingService {
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

    // ---- suppliers ----

    pub async fn create_supplier(
        &self,
        input: CreateSupplierInput,
    ) -> Result<supplier::Model, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Supplier name must not be empty".to_string(),
            ));
        }
        let model = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            contact_info: Set(input.contact_info),
            created_at: Set(Utc::now()),
        };
        Ok(model.insert(&*self.db).await?)
    }

    pub async fn list_suppliers(&self) -> Result<Vec<supplier::Model>, ServiceError> {
        Ok(Supplier::find()
            .order_by_asc(supplier::Column::Name)
            .all(&*self.db)
            .await?)
    }

    // ---- purchases ----

    /// Records a purchase order. The stated total must equal the sum of the
    /// lines plus tax minus discount.
    #[instrument(skip(self, input))]
    pub async fn create_purchase(
        &self,
        input: CreatePurchaseInput,
    ) -> Result<PurchaseWithItems, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "A purchase needs at least one line".to_string(),
            ));
        }
        for (index, item) in input.items.iter().enumerate() {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Line {}: quantity must be positive",
                    index + 1
                )));
            }
            if item.unit_cost < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Line {}: unit cost cannot be negative",
                    index + 1
                )));
            }
        }

        let expected_total = purchase_total(&input.items, input.tax_amount, input.discount);
        if input.total_amount != expected_total {
            return Err(ServiceError::ValidationError(format!(
                "Total {} does not match lines + tax - discount = {}",
                input.total_amount, expected_total
            )));
        }

        Supplier::find_by_id(input.supplier_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Supplier {} not found", input.supplier_id))
            })?;

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let purchase_id = Uuid::new_v4();

        let model = purchase::ActiveModel {
            id: Set(purchase_id),
            supplier_id: Set(input.supplier_id),
            purchase_date: Set(input.purchase_date),
            invoice_number: Set(input.invoice_number),
            tax_amount: Set(input.tax_amount),
            discount: Set(input.discount),
            total_amount: Set(input.total_amount),
            payment_status: Set(input
                .payment_status
                .unwrap_or(PurchasePaymentStatus::Unpaid)),
            delivery_date: Set(None),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&txn).await?;

        let mut lines = Vec::with_capacity(input.items.len());
        for item in &input.items {
            Product::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;

            let line = purchase_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                purchase_id: Set(purchase_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_cost: Set(item.unit_cost),
            };
            lines.push(line.insert(&txn).await?);
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PurchaseCreated(purchase_id))
            .await;
        info!("Created purchase {} from supplier {}", purchase_id, input.supplier_id);
        Ok(PurchaseWithItems {
            purchase: created,
            items: lines,
        })
    }

    pub async fn get_purchase(&self, purchase_id: Uuid) -> Result<PurchaseWithItems, ServiceError> {
        let purchase = Purchase::find_by_id(purchase_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase {} not found", purchase_id))
            })?;
        let items = purchase.find_related(PurchaseItem).all(&*self.db).await?;
        Ok(PurchaseWithItems { purchase, items })
    }

    pub async fn list_purchases(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<purchase::Model>, u64), ServiceError> {
        let paginator = Purchase::find()
            .order_by_desc(purchase::Column::PurchaseDate)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// Receives a delivered purchase: stamps the delivery date and increments
    /// stock for each line in one transaction. Receiving twice is an error.
    #[instrument(skip(self))]
    pub async fn receive_purchase(
        &self,
        purchase_id: Uuid,
        delivery_date: Option<NaiveDate>,
    ) -> Result<purchase::Model, ServiceError> {
        let purchase = Purchase::find_by_id(purchase_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase {} not found", purchase_id))
            })?;

        if purchase.delivery_date.is_some() {
            return Err(ServiceError::InvalidOperation(
                "Purchase has already been received".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let items = PurchaseItem::find()
            .filter(purchase_item::Column::PurchaseId.eq(purchase_id))
            .all(&txn)
            .await?;

        let mut adjustments: Vec<AdjustmentOutcome> = Vec::with_capacity(items.len());
        for item in &items {
            let outcome = self
                .inventory
                .adjust_on(&txn, item.product_id, item.quantity, "purchase received")
                .await?;
            adjustments.push(outcome);
        }

        let mut active: purchase::ActiveModel = purchase.into();
        active.delivery_date = Set(Some(
            delivery_date.unwrap_or_else(|| Utc::now().date_naive()),
        ));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        self.inventory
            .emit_adjustment_events("purchase received", &adjustments)
            .await;
        self.event_sender
            .send_or_log(Event::PurchaseReceived(purchase_id))
            .await;

        info!("Received purchase {} ({} lines)", purchase_id, items.len());
        Ok(updated)
    }
}

fn purchase_total(items: &[PurchaseLineInput], tax: Decimal, discount: Decimal) -> Decimal {
    let lines: Decimal = items
        .iter()
        .map(|item| item.unit_cost * Decimal::from(item.quantity))
        .sum();
    lines + tax - discount
}

#[derive(Debug, Deserialize)]
pub struct CreateSupplierInput {
    pub name: String,
    pub contact_info: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseInput {
    pub supplier_id: Uuid,
    pub purchase_date: NaiveDate,
    pub invoice_number: String,
    pub tax_amount: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub payment_status: Option<PurchasePaymentStatus>,
    pub notes: Option<String>,
    pub items: Vec<PurchaseLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_cost: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PurchaseWithItems {
    pub purchase: purchase::Model,
    pub items: Vec<purchase_item::Model>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(unit_cost: Decimal, quantity: i32) -> PurchaseLineInput {
        PurchaseLineInput {
            product_id: Uuid::new_v4(),
            quantity,
            unit_cost,
        }
    }

    #[test]
    fn total_includes_tax_and_discount() {
        let items = vec![line(dec!(8.00), 10), line(dec!(2.50), 4)];
        let total = purchase_total(&items, dec!(16.20), dec!(5.00));
        // 80 + 10 + 16.20 - 5 = 101.20
        assert_eq!(total, dec!(101.20));
    }

    #[test]
    fn total_of_no_lines_is_tax_minus_discount() {
        let total = purchase_total(&[], dec!(1.00), dec!(0.25));
        assert_eq!(total, dec!(0.75));
    }
}
