use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    handlers::common::{
        clamp_pagination, created_response, map_service_error, no_content_response,
        success_response, PaginatedResponse, PaginationParams,
    },
    services::customers::CustomerInput,
    AppState,
};

pub async fn list_customers(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ApiError> {
    let (page, per_page) = clamp_pagination(pagination.page, pagination.per_page);
    let (customers, total) = state
        .services
        .customers
        .list_customers(page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        customers, page, per_page, total,
    )))
}

/// Name/id pairs for the POS customer picker
pub async fn lookup(State(state): State<AppState>) -> Result<Response, ApiError> {
    let options = state
        .services
        .customers
        .lookup()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(options))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let customer = state
        .services
        .customers
        .get_customer(customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(customer))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CustomerInput>,
) -> Result<Response, ApiError> {
    let customer = state
        .services
        .customers
        .create_customer(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(customer))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<CustomerInput>,
) -> Result<Response, ApiError> {
    let customer = state
        .services
        .customers
        .update_customer(customer_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(customer))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state
        .services
        .customers
        .delete_customer(customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
