use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    handlers::common::{
        clamp_pagination, created_response, map_service_error, success_response,
        PaginatedResponse, PaginationParams,
    },
    services::purchasing::{CreatePurchaseInput, CreateSupplierInput},
    AppState,
};

// ---- suppliers ----

pub async fn list_suppliers(State(state): State<AppState>) -> Result<Response, ApiError> {
    let suppliers = state
        .services
        .purchasing
        .list_suppliers()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(suppliers))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Json(payload): Json<CreateSupplierInput>,
) -> Result<Response, ApiError> {
    let supplier = state
        .services
        .purchasing
        .create_supplier(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(supplier))
}

// ---- purchases ----

pub async fn list_purchases(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ApiError> {
    let (page, per_page) = clamp_pagination(pagination.page, pagination.per_page);
    let (purchases, total) = state
        .services
        .purchasing
        .list_purchases(page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        purchases, page, per_page, total,
    )))
}

pub async fn get_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let purchase = state
        .services
        .purchasing
        .get_purchase(purchase_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(purchase))
}

/// Records a purchase order; the stated total must match its lines
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(payload): Json<CreatePurchaseInput>,
) -> Result<Response, ApiError> {
    let purchase = state
        .services
        .purchasing
        .create_purchase(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(purchase))
}

#[derive(Debug, serde::Deserialize, Default)]
pub struct ReceiveRequest {
    pub delivery_date: Option<chrono::NaiveDate>,
}

/// Stamps the delivery date and restocks every line
pub async fn receive_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
    payload: Option<Json<ReceiveRequest>>,
) -> Result<Response, ApiError> {
    let delivery_date = payload.and_then(|Json(body)| body.delivery_date);
    let purchase = state
        .services
        .purchasing
        .receive_purchase(purchase_id, delivery_date)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(purchase))
}
