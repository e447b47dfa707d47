use crate::{
    entities::{sale, sale_item, Customer, Product, Sale, SaleItem},
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::{AdjustmentOutcome, InventoryService},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Point-of-sale service.
///
/// A sale is recorded as one arithmetic-checked unit: every line total must
/// equal price x quantity, the subtotal must equal the sum of the lines, the
/// grand total must equal subtotal plus tax, and the amount paid must cover
/// the grand total. Stock for each line is decremented in the same
/// transaction as the sale rows.
pub struct SalesService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    inventory: Arc<InventoryService>,
}

impl SalesService {
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

    #[instrument(skip(self, input))]
    pub async fn create_sale(&self, input: CreateSaleInput) -> Result<SaleWithItems, ServiceError> {
        let totals = validate_sale_arithmetic(&input)?;

        if let Some(customer_id) = input.customer_id {
            Customer::find_by_id(customer_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Customer {} not found", customer_id))
                })?;
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let sale_id = Uuid::new_v4();

        let sale = sale::ActiveModel {
            id: Set(sale_id),
            customer_id: Set(input.customer_id),
            cashier_id: Set(input.cashier_id),
            sub_total: Set(totals.sub_total),
            tax_percentage: Set(input.tax_percentage),
            tax_amount: Set(totals.tax_amount),
            grand_total: Set(totals.grand_total),
            amount_paid: Set(input.amount_paid),
            amount_change: Set(totals.amount_change),
            created_at: Set(now),
        };
        let sale = sale.insert(&txn).await?;

        let mut lines = Vec::with_capacity(input.items.len());
        let mut adjustments: Vec<AdjustmentOutcome> = Vec::with_capacity(input.items.len());
        for item in &input.items {
            Product::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;

            let line = sale_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                sale_id: Set(sale_id),
                product_id: Set(item.product_id),
                variant_id: Set(item.variant_id),
                price: Set(item.price),
                quantity: Set(item.quantity),
                total: Set(item.total),
                created_at: Set(now),
            };
            lines.push(line.insert(&txn).await?);

            let outcome = self
                .inventory
                .adjust_on(&txn, item.product_id, -item.quantity, "pos sale")
                .await?;
            adjustments.push(outcome);
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::SaleRecorded {
                sale_id,
                grand_total: totals.grand_total,
            })
            .await;
        self.inventory
            .emit_adjustment_events("pos sale", &adjustments)
            .await;

        info!("Recorded sale {} for {}", sale_id, totals.grand_total);
        Ok(SaleWithItems { sale, items: lines })
    }

    pub async fn get_sale(&self, sale_id: Uuid) -> Result<SaleWithItems, ServiceError> {
        let sale = Sale::find_by_id(sale_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", sale_id)))?;
        let items = sale.find_related(SaleItem).all(&*self.db).await?;
        Ok(SaleWithItems { sale, items })
    }

    /// Lists sales newest-first together with the grand-total aggregate over
    /// the whole table
    pub async fn list_sales(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<SalesPage, ServiceError> {
        let paginator = Sale::find()
            .order_by_desc(sale::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let sales = paginator.fetch_page(page.saturating_sub(1)).await?;

        let all = Sale::find().all(&*self.db).await?;
        let grand_total: Decimal = all.iter().map(|s| s.grand_total).sum();

        Ok(SalesPage {
            sales,
            total,
            grand_total,
        })
    }

    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<sale::Model>, ServiceError> {
        Ok(Sale::find()
            .filter(sale::Column::CustomerId.eq(customer_id))
            .order_by_desc(sale::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }
}

/// Derived totals checked against the submitted numbers
struct SaleTotals {
    sub_total: Decimal,
    tax_amount: Decimal,
    grand_total: Decimal,
    amount_change: Decimal,
}

fn validate_sale_arithmetic(input: &CreateSaleInput) -> Result<SaleTotals, ServiceError> {
    if input.items.is_empty() {
        return Err(ServiceError::ValidationError(
            "A sale needs at least one line".to_string(),
        ));
    }
    if input.tax_percentage < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Tax percentage cannot be negative".to_string(),
        ));
    }

    let mut sub_total = Decimal::ZERO;
    for (index, item) in input.items.iter().enumerate() {
        if item.quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Line {}: quantity must be positive",
                index + 1
            )));
        }
        if item.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Line {}: price cannot be negative",
                index + 1
            )));
        }
        let expected = item.price * Decimal::from(item.quantity);
        if item.total != expected {
            return Err(ServiceError::ValidationError(format!(
                "Line {}: total {} does not match price x quantity {}",
                index + 1,
                item.total,
                expected
            )));
        }
        sub_total += item.total;
    }

    let tax_amount = (sub_total * input.tax_percentage / Decimal::from(100)).round_dp(2);
    let grand_total = sub_total + tax_amount;

    if input.amount_paid < grand_total {
        return Err(ServiceError::ValidationError(format!(
            "Amount paid {} does not cover the grand total {}",
            input.amount_paid, grand_total
        )));
    }

    Ok(SaleTotals {
        sub_total,
        tax_amount,
        grand_total,
        amount_change: input.amount_paid - grand_total,
    })
}

/// Input for recording a sale
#[derive(Debug, Deserialize)]
pub struct CreateSaleInput {
    pub customer_id: Option<Uuid>,
    pub cashier_id: Option<Uuid>,
    pub tax_percentage: Decimal,
    pub amount_paid: Decimal,
    pub items: Vec<SaleLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct SaleLineInput {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub price: Decimal,
    pub quantity: i32,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SaleWithItems {
    pub sale: sale::Model,
    pub items: Vec<sale_item::Model>,
}

#[derive(Debug, Serialize)]
pub struct SalesPage {
    pub sales: Vec<sale::Model>,
    pub total: u64,
    pub grand_total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(price: Decimal, quantity: i32) -> SaleLineInput {
        SaleLineInput {
            product_id: Uuid::new_v4(),
            variant_id: None,
            price,
            quantity,
            total: price * Decimal::from(quantity),
        }
    }

    fn sale(items: Vec<SaleLineInput>, tax_percentage: Decimal, paid: Decimal) -> CreateSaleInput {
        CreateSaleInput {
            customer_id: None,
            cashier_id: None,
            tax_percentage,
            amount_paid: paid,
            items,
        }
    }

    #[test]
    fn totals_add_up() {
        let input = sale(
            vec![line(dec!(10.00), 2), line(dec!(5.50), 1)],
            dec!(18),
            dec!(40.00),
        );
        let totals = validate_sale_arithmetic(&input).unwrap();
        assert_eq!(totals.sub_total, dec!(25.50));
        assert_eq!(totals.tax_amount, dec!(4.59));
        assert_eq!(totals.grand_total, dec!(30.09));
        assert_eq!(totals.amount_change, dec!(9.91));
    }

    #[test]
    fn mismatched_line_total_is_rejected() {
        let mut input = sale(vec![line(dec!(10.00), 2)], Decimal::ZERO, dec!(100));
        input.items[0].total = dec!(19.99);
        let err = validate_sale_arithmetic(&input).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn underpayment_is_rejected() {
        let input = sale(vec![line(dec!(10.00), 3)], Decimal::ZERO, dec!(29.99));
        assert!(validate_sale_arithmetic(&input).is_err());
    }

    #[test]
    fn empty_sale_is_rejected() {
        let input = sale(vec![], Decimal::ZERO, Decimal::ZERO);
        assert!(validate_sale_arithmetic(&input).is_err());
    }

    #[test]
    fn exact_payment_leaves_no_change() {
        let input = sale(vec![line(dec!(12.00), 1)], Decimal::ZERO, dec!(12.00));
        let totals = validate_sale_arithmetic(&input).unwrap();
        assert_eq!(totals.amount_change, Decimal::ZERO);
    }

    #[test]
    fn zero_quantity_line_is_rejected() {
        let input = sale(vec![line(dec!(10.00), 0)], Decimal::ZERO, dec!(10));
        assert!(validate_sale_arithmetic(&input).is_err());
    }
}
