use crate::{
    config::AppConfig,
    entities::{
        cart::{self, CartStatus},
        cart_item, Cart, CartItem, CartModel, ProductVariant,
    },
    errors::ServiceError,
    events::{Event, EventSender},
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

/// Shopping cart service.
///
/// Carts accumulate variant line items ahead of checkout. Totals are
/// recalculated after every mutation so the stored cart always satisfies
/// `line_total = unit_price * quantity`, `subtotal = sum(line_total)` and
/// `total = subtotal + tax_total`.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Creates a new, empty cart
    #[instrument(skip(self))]
    pub async fn create_cart(&self, input: CreateCartInput) -> Result<CartModel, ServiceError> {
        let cart_id = Uuid::new_v4();

        let cart = cart::ActiveModel {
            id: Set(cart_id),
            customer_id: Set(input.customer_id),
            currency: Set(input
                .currency
                .unwrap_or_else(|| self.config.default_currency.clone())),
            subtotal: Set(Decimal::ZERO),
            tax_total: Set(Decimal::ZERO),
            total: Set(Decimal::ZERO),
            status: Set(CartStatus::Active),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        let cart = cart.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartCreated(cart_id))
            .await;

        info!("Created cart: {}", cart_id);
        Ok(cart)
    }

    /// Returns the customer's active cart, creating one if none exists
    pub async fn get_or_create_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<CartModel, ServiceError> {
        let existing = Cart::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .filter(cart::Column::Status.eq(CartStatus::Active))
            .order_by_desc(cart::Column::CreatedAt)
            .one(&*self.db)
            .await?;

        match existing {
            Some(cart) => Ok(cart),
            None => {
                self.create_cart(CreateCartInput {
                    customer_id: Some(customer_id),
                    currency: None,
                })
                .await
            }
        }
    }

    /// Adds an item to the cart, merging the quantity when the variant is
    /// already present. Totals are recalculated in the same transaction.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: Uuid,
        input: AddToCartInput,
    ) -> Result<CartModel, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be greater than zero".to_string(),
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

        let variant = ProductVariant::find_by_id(input.variant_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Variant {} not found", input.variant_id))
            })?;

        let existing_item = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::VariantId.eq(input.variant_id))
            .one(&txn)
            .await?;

        if let Some(item) = existing_item {
            // The unit price stays at its original snapshot when merging
            let new_quantity = item.quantity + input.quantity;
            let unit_price = item.unit_price;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(new_quantity);
            item.line_total = Set(unit_price * Decimal::from(new_quantity));
            item.updated_at = Set(Utc::now());
            item.update(&txn).await?;
        } else {
            let item = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart_id),
                product_id: Set(variant.product_id),
                variant_id: Set(input.variant_id),
                quantity: Set(input.quantity),
                unit_price: Set(variant.price),
                line_total: Set(variant.price * Decimal::from(input.quantity)),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
            };
            item.insert(&txn).await?;
        }

        let updated_cart = self.recalculate_cart_totals(&txn, cart_id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id,
                variant_id: input.variant_id,
            })
            .await;

        info!(
            "Added item to cart {}: variant {} x{}",
            cart_id, input.variant_id, input.quantity
        );
        Ok(updated_cart)
    }

    /// Updates a cart item's quantity; zero or less removes the item
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartModel, ServiceError> {
        let txn = self.db.begin().await?;

        let item = CartItem::find_by_id(item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        if item.cart_id != cart_id {
            return Err(ServiceError::InvalidOperation(
                "Item does not belong to this cart".to_string(),
            ));
        }

        if quantity <= 0 {
            item.delete(&txn).await?;
        } else {
            let unit_price = item.unit_price;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(quantity);
            item.line_total = Set(unit_price * Decimal::from(quantity));
            item.updated_at = Set(Utc::now());
            item.update(&txn).await?;
        }

        let updated_cart = self.recalculate_cart_totals(&txn, cart_id).await?;
        txn.commit().await?;

        if quantity <= 0 {
            self.event_sender
                .send_or_log(Event::CartItemRemoved { cart_id, item_id })
                .await;
        }

        Ok(updated_cart)
    }

    /// Retrieves a cart with all its items
    pub async fn get_cart(&self, cart_id: Uuid) -> Result<CartWithItems, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        let items = cart.find_related(CartItem).all(&*self.db).await?;

        Ok(CartWithItems { cart, items })
    }

    /// Marks a cart as abandoned without deleting it
    pub async fn abandon_cart(&self, cart_id: Uuid) -> Result<CartModel, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        let mut active: cart::ActiveModel = cart.into();
        active.status = Set(CartStatus::Abandoned);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::CartUpdated(updated.id))
            .await;
        Ok(updated)
    }

    /// Deletes all items and resets the totals to zero
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, cart_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(&txn)
            .await?;

        self.recalculate_cart_totals(&txn, cart_id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartCleared(cart_id))
            .await;

        info!("Cleared cart: {}", cart_id);
        Ok(())
    }

    /// Recomputes subtotal, tax, and total from the cart's items
    async fn recalculate_cart_totals(
        &self,
        conn: &impl sea_orm::ConnectionTrait,
        cart_id: Uuid,
    ) -> Result<CartModel, ServiceError> {
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(conn)
            .await?;

        let subtotal: Decimal = items.iter().map(|item| item.line_total).sum();
        let tax_rate =
            Decimal::from_f64_retain(self.config.default_tax_rate).unwrap_or(Decimal::ZERO);
        let tax_total = (subtotal * tax_rate).round_dp(2);
        let total = subtotal + tax_total;

        let mut cart: cart::ActiveModel = Cart::find_by_id(cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?
            .into();

        cart.subtotal = Set(subtotal);
        cart.tax_total = Set(tax_total);
        cart.total = Set(total);
        cart.updated_at = Set(Utc::now());

        Ok(cart.update(conn).await?)
    }
}

/// Input for creating a cart
#[derive(Debug, Deserialize)]
pub struct CreateCartInput {
    pub customer_id: Option<Uuid>,
    pub currency: Option<String>,
}

/// Input for adding an item to a cart
#[derive(Debug, Deserialize)]
pub struct AddToCartInput {
    pub variant_id: Uuid,
    pub quantity: i32,
}

/// Cart with its line items
#[derive(Debug, Serialize)]
pub struct CartWithItems {
    pub cart: CartModel,
    pub items: Vec<cart_item::Model>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_total_is_price_times_quantity() {
        let unit_price = dec!(25.50);
        let line_total = unit_price * Decimal::from(3);
        assert_eq!(line_total, dec!(76.50));
    }

    #[test]
    fn subtotal_is_sum_of_line_totals() {
        let line_totals = [dec!(25.00), dec!(35.50), dec!(14.50)];
        let subtotal: Decimal = line_totals.iter().copied().sum();
        assert_eq!(subtotal, dec!(75.00));
    }

    #[test]
    fn tax_is_rounded_to_cents() {
        let subtotal = dec!(99.99);
        let tax_rate = Decimal::from_f64_retain(0.18).unwrap();
        let tax_total = (subtotal * tax_rate).round_dp(2);
        assert_eq!(tax_total, dec!(18.00));
    }

    #[test]
    fn zero_tax_rate_keeps_total_equal_to_subtotal() {
        let subtotal = dec!(42.00);
        let tax_rate = Decimal::from_f64_retain(0.0).unwrap();
        let total = subtotal + (subtotal * tax_rate).round_dp(2);
        assert_eq!(total, subtotal);
    }

    #[test]
    fn add_to_cart_input_deserialization() {
        let json = r#"{
            "variant_id": "550e8400-e29b-41d4-a716-446655440000",
            "quantity": 3
        }"#;

        let input: AddToCartInput =
            serde_json::from_str(json).expect("deserialization should succeed");
        assert_eq!(input.quantity, 3);
        assert_eq!(
            input.variant_id.to_string(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
    }
}
