use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::{
    handlers::common::{
        clamp_pagination, created_response, map_service_error, no_content_response,
        success_response, PaginatedResponse, PaginationParams,
    },
    errors::ApiError,
    services::catalog::{
        AddImageInput, CreateCategoryInput, CreateProductInput, CreateVariantInput, ProductFilter,
        UpdateProductInput, UpdateVariantInput,
    },
    AppState,
};

// ---- categories ----

pub async fn list_categories(State(state): State<AppState>) -> Result<Response, ApiError> {
    let categories = state
        .services
        .catalog
        .list_categories()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryInput>,
) -> Result<Response, ApiError> {
    let category = state
        .services
        .catalog
        .create_category(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(category))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<CreateCategoryInput>,
) -> Result<Response, ApiError> {
    let category = state
        .services
        .catalog
        .update_category(category_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state
        .services
        .catalog
        .delete_category(category_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

// ---- products ----

/// Listing filters plus pagination, all optional. Kept flat because axum's
/// `Query` extractor cannot see through `#[serde(flatten)]`.
#[derive(Debug, serde::Deserialize)]
pub struct ProductListQuery {
    pub status: Option<crate::entities::product::ProductStatus>,
    pub category_id: Option<Uuid>,
    pub min_price: Option<rust_decimal::Decimal>,
    pub max_price: Option<rust_decimal::Decimal>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Response, ApiError> {
    let defaults = PaginationParams::default();
    let (page, per_page) = clamp_pagination(
        query.page.unwrap_or(defaults.page),
        query.per_page.unwrap_or(defaults.per_page),
    );
    let filter = ProductFilter {
        status: query.status,
        category_id: query.category_id,
        min_price: query.min_price,
        max_price: query.max_price,
        search: query.search,
    };
    let (products, total) = state
        .services
        .catalog
        .list_products(filter, page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        products, page, per_page, total,
    )))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let detail = state
        .services
        .catalog
        .get_product(product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<Response, ApiError> {
    let product = state
        .services
        .catalog
        .create_product(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<Response, ApiError> {
    let product = state
        .services
        .catalog
        .update_product(product_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state
        .services
        .catalog
        .delete_product(product_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

// ---- variants ----

pub async fn add_variant(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<CreateVariantInput>,
) -> Result<Response, ApiError> {
    let variant = state
        .services
        .catalog
        .add_variant(product_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(variant))
}

pub async fn update_variant(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
    Json(payload): Json<UpdateVariantInput>,
) -> Result<Response, ApiError> {
    let variant = state
        .services
        .catalog
        .update_variant(variant_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(variant))
}

pub async fn remove_variant(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state
        .services
        .catalog
        .remove_variant(variant_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

// ---- images ----

pub async fn add_image(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<AddImageInput>,
) -> Result<Response, ApiError> {
    let image = state
        .services
        .catalog
        .add_image(product_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(image))
}

pub async fn set_default_image(
    State(state): State<AppState>,
    Path((product_id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ApiError> {
    let image = state
        .services
        .catalog
        .set_default_image(product_id, image_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(image))
}

pub async fn remove_image(
    State(state): State<AppState>,
    Path(image_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state
        .services
        .catalog
        .remove_image(image_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
