use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    handlers::common::{
        clamp_pagination, map_service_error, success_response, PaginatedResponse,
        PaginationParams,
    },
    AppState,
};

pub async fn list_levels(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ApiError> {
    let (page, per_page) = clamp_pagination(pagination.page, pagination.per_page);
    let (levels, total) = state
        .services
        .inventory
        .list_levels(page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        levels, page, per_page, total,
    )))
}

pub async fn get_level(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let level = state
        .services
        .inventory
        .get_level(product_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(level))
}

pub async fn low_stock(State(state): State<AppState>) -> Result<Response, ApiError> {
    let levels = state
        .services
        .inventory
        .low_stock()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(levels))
}

pub async fn summary(State(state): State<AppState>) -> Result<Response, ApiError> {
    let summary = state
        .services
        .inventory
        .summary()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(summary))
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub delta: i32,
    pub reason: String,
}

/// Applies a signed stock delta; going below zero is rejected with 422
pub async fn adjust(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<AdjustRequest>,
) -> Result<Response, ApiError> {
    let level = state
        .services
        .inventory
        .adjust(product_id, payload.delta, &payload.reason)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(level))
}

#[derive(Debug, Deserialize)]
pub struct SetLevelRequest {
    pub quantity: i32,
    pub low_stock_threshold: i32,
}

pub async fn set_level(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<SetLevelRequest>,
) -> Result<Response, ApiError> {
    let level = state
        .services
        .inventory
        .set_level(product_id, payload.quantity, payload.low_stock_threshold)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(level))
}
