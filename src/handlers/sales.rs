use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    handlers::common::{
        clamp_pagination, created_response, map_service_error, success_response, PaginationParams,
    },
    services::sales::CreateSaleInput,
    AppState,
};

/// Records a POS sale. The submitted arithmetic is validated before anything
/// is written; the cashier defaults to the authenticated user.
pub async fn create_sale(
    State(state): State<AppState>,
    cashier: AuthenticatedUser,
    Json(mut payload): Json<CreateSaleInput>,
) -> Result<Response, ApiError> {
    if payload.cashier_id.is_none() {
        payload.cashier_id = Some(cashier.id);
    }
    let sale = state
        .services
        .sales
        .create_sale(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(sale))
}

pub async fn list_sales(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ApiError> {
    let (page, per_page) = clamp_pagination(pagination.page, pagination.per_page);
    let page = state
        .services
        .sales
        .list_sales(page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let sale = state
        .services
        .sales
        .get_sale(sale_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(sale))
}

pub async fn list_for_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let sales = state
        .services
        .sales
        .list_for_customer(customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(sales))
}
