use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    handlers::common::{created_response, map_service_error, success_response},
    services::checkout::CheckoutInput,
    AppState,
};

/// Converts an active cart into an order. For mobile-money orders a single
/// collection request is issued after the order is written; a gateway failure
/// surfaces as 402 with the order left in payment status `failed`.
pub async fn checkout_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Json(payload): Json<CheckoutInput>,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .checkout
        .checkout(cart_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(order))
}

/// Polls the payment provider once and records the outcome on the order
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let check = state
        .services
        .checkout
        .confirm_payment(order_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(check))
}
