use crate::{
    entities::{
        inventory_level,
        product::{self, ProductStatus},
        product_category, product_image, product_variant, InventoryLevel, Product,
        ProductCategory, ProductImage, ProductVariant,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::InventoryService,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Product catalog service: categories, products, their sellable variants,
/// and product images.
///
/// Creating a product also creates its inventory level so that stock tracking
/// starts at zero rather than being absent.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    inventory: Arc<InventoryService>,
}

impl CatalogService {
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

    // ---- categories ----

    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<product_category::Model, ServiceError> {
        let category = product_category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
        };
        Ok(category.insert(&*self.db).await?)
    }

    pub async fn list_categories(&self) -> Result<Vec<product_category::Model>, ServiceError> {
        Ok(ProductCategory::find()
            .order_by_asc(product_category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn update_category(
        &self,
        category_id: Uuid,
        input: CreateCategoryInput,
    ) -> Result<product_category::Model, ServiceError> {
        let category = ProductCategory::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Category {} not found", category_id))
            })?;

        let mut active: product_category::ActiveModel = category.into();
        active.name = Set(input.name);
        active.description = Set(input.description);
        Ok(active.update(&*self.db).await?)
    }

    /// Deleting a category leaves its products uncategorized
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let category = ProductCategory::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Category {} not found", category_id))
            })?;
        category.delete(&*self.db).await?;
        Ok(())
    }

    // ---- products ----

    /// Creates a product together with its zeroed inventory level
    #[instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        if let Some(category_id) = input.category_id {
            ProductCategory::find_by_id(category_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Category {} not found", category_id))
                })?;
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let product_id = Uuid::new_v4();

        let model = product::ActiveModel {
            id: Set(product_id),
            name: Set(input.name),
            description: Set(input.description),
            status: Set(input.status.unwrap_or(ProductStatus::Active)),
            category_id: Set(input.category_id),
            cost: Set(input.cost.unwrap_or(Decimal::ZERO)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&txn).await?;

        self.inventory
            .create_level_on(
                &txn,
                product_id,
                input.initial_stock.unwrap_or(0),
                input.low_stock_threshold.unwrap_or(5),
            )
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product_id))
            .await;
        info!("Created product: {}", product_id);
        Ok(created)
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductDetail, ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let variants = product
            .find_related(ProductVariant)
            .order_by_asc(product_variant::Column::Position)
            .all(&*self.db)
            .await?;
        let images = product.find_related(ProductImage).all(&*self.db).await?;

        Ok(ProductDetail {
            product,
            variants,
            images,
        })
    }

    /// Lists products with the storefront filters: category, price range over
    /// variants, and a name search.
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut query = Product::find();

        if let Some(status) = filter.status {
            query = query.filter(product::Column::Status.eq(status));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
            query = query.filter(product::Column::Name.contains(search.trim()));
        }

        if filter.min_price.is_some() || filter.max_price.is_some() {
            let mut variant_query = ProductVariant::find()
                .select_only()
                .column(product_variant::Column::ProductId)
                .distinct();
            if let Some(min) = filter.min_price {
                variant_query = variant_query.filter(product_variant::Column::Price.gte(min));
            }
            if let Some(max) = filter.max_price {
                variant_query = variant_query.filter(product_variant::Column::Price.lte(max));
            }
            let ids: Vec<Uuid> = variant_query.into_tuple().all(&*self.db).await?;
            query = query.filter(product::Column::Id.is_in(ids));
        }

        let paginator = query
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let mut active: product::ActiveModel = product.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        if let Some(category_id) = input.category_id {
            ProductCategory::find_by_id(category_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Category {} not found", category_id))
                })?;
            active.category_id = Set(Some(category_id));
        }
        if let Some(cost) = input.cost {
            active.cost = Set(cost);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;
        Ok(updated)
    }

    /// Deletes a product together with its stock row; variants and images
    /// go with it via their foreign keys
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let txn = self.db.begin().await?;
        InventoryLevel::delete_many()
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        product.delete(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;
        Ok(())
    }

    // ---- variants ----

    #[instrument(skip(self, input))]
    pub async fn add_variant(
        &self,
        product_id: Uuid,
        input: CreateVariantInput,
    ) -> Result<product_variant::Model, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        self.ensure_unique_sku(&input.sku, None).await?;

        if input.price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Variant price must be positive".to_string(),
            ));
        }
        if input.volume_ml <= 0 {
            return Err(ServiceError::ValidationError(
                "Variant volume must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let variant_id = Uuid::new_v4();
        let variant = product_variant::ActiveModel {
            id: Set(variant_id),
            product_id: Set(product_id),
            sku: Set(input.sku),
            volume_ml: Set(input.volume_ml),
            price: Set(input.price),
            position: Set(input.position.unwrap_or(1)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = variant.insert(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::VariantCreated {
                product_id,
                variant_id,
            })
            .await;
        Ok(created)
    }

    pub async fn update_variant(
        &self,
        variant_id: Uuid,
        input: UpdateVariantInput,
    ) -> Result<product_variant::Model, ServiceError> {
        let variant = ProductVariant::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;

        if let Some(price) = input.price {
            if price <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Variant price must be positive".to_string(),
                ));
            }
        }

        let mut active: product_variant::ActiveModel = variant.into();
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(volume_ml) = input.volume_ml {
            active.volume_ml = Set(volume_ml);
        }
        if let Some(position) = input.position {
            active.position = Set(position);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    pub async fn remove_variant(&self, variant_id: Uuid) -> Result<(), ServiceError> {
        let variant = ProductVariant::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;
        variant.delete(&*self.db).await?;
        Ok(())
    }

    // ---- images ----

    pub async fn add_image(
        &self,
        product_id: Uuid,
        input: AddImageInput,
    ) -> Result<product_image::Model, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let image = product_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            url: Set(input.url),
            alt_text: Set(input.alt_text),
            is_default: Set(false),
            created_at: Set(Utc::now()),
        };
        let created = image.insert(&*self.db).await?;

        if input.is_default {
            return self.set_default_image(product_id, created.id).await;
        }
        Ok(created)
    }

    /// Makes `image_id` the product's default image. The previous default is
    /// cleared in the same transaction so the one-default invariant holds.
    #[instrument(skip(self))]
    pub async fn set_default_image(
        &self,
        product_id: Uuid,
        image_id: Uuid,
    ) -> Result<product_image::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let image = ProductImage::find_by_id(image_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Image {} not found", image_id)))?;
        if image.product_id != product_id {
            return Err(ServiceError::InvalidOperation(
                "Image does not belong to this product".to_string(),
            ));
        }

        let defaults = ProductImage::find()
            .filter(product_image::Column::ProductId.eq(product_id))
            .filter(product_image::Column::IsDefault.eq(true))
            .all(&txn)
            .await?;
        for old_default in defaults {
            let mut active: product_image::ActiveModel = old_default.into();
            active.is_default = Set(false);
            active.update(&txn).await?;
        }

        let mut active: product_image::ActiveModel = image.into();
        active.is_default = Set(true);
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::DefaultImageChanged {
                product_id,
                image_id,
            })
            .await;
        Ok(updated)
    }

    pub async fn remove_image(&self, image_id: Uuid) -> Result<(), ServiceError> {
        let image = ProductImage::find_by_id(image_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Image {} not found", image_id)))?;
        image.delete(&*self.db).await?;
        Ok(())
    }

    async fn ensure_unique_sku(
        &self,
        sku: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = ProductVariant::find().filter(product_variant::Column::Sku.eq(sku));
        if let Some(id) = exclude {
            query = query.filter(product_variant::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "SKU {} is already in use",
                sku
            )));
        }
        Ok(())
    }
}

/// Input for creating a category
#[derive(Debug, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    pub description: Option<String>,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub description: String,
    pub status: Option<ProductStatus>,
    pub category_id: Option<Uuid>,
    pub cost: Option<Decimal>,
    pub initial_stock: Option<i32>,
    pub low_stock_threshold: Option<i32>,
}

/// Input for updating a product
#[derive(Debug, Deserialize, Default)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProductStatus>,
    pub category_id: Option<Uuid>,
    pub cost: Option<Decimal>,
}

/// Input for creating a variant
#[derive(Debug, Deserialize)]
pub struct CreateVariantInput {
    pub sku: String,
    pub volume_ml: i32,
    pub price: Decimal,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateVariantInput {
    pub price: Option<Decimal>,
    pub volume_ml: Option<i32>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct AddImageInput {
    pub url: String,
    pub alt_text: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Storefront listing filters
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub status: Option<ProductStatus>,
    pub category_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
}

/// Product with its variants and images
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: product::Model,
    pub variants: Vec<product_variant::Model>,
    pub images: Vec<product_image::Model>,
}
