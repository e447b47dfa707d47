use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    handlers::common::{created_response, map_service_error, no_content_response, success_response},
    services::carts::{AddToCartInput, CreateCartInput},
    AppState,
};

pub async fn create_cart(
    State(state): State<AppState>,
    Json(payload): Json<CreateCartInput>,
) -> Result<Response, ApiError> {
    let cart = state
        .services
        .carts
        .create_cart(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(cart))
}

pub async fn get_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let cart = state
        .services
        .carts
        .get_cart(cart_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Returns the customer's active cart, creating one when none exists
pub async fn cart_for_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let cart = state
        .services
        .carts
        .get_or_create_for_customer(customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

pub async fn add_item(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Json(payload): Json<AddToCartInput>,
) -> Result<Response, ApiError> {
    let cart = state
        .services
        .carts
        .add_item(cart_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

/// Sets a line's quantity; zero removes the line
pub async fn update_item(
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Response, ApiError> {
    let cart = state
        .services
        .carts
        .update_item_quantity(cart_id, item_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ApiError> {
    state
        .services
        .carts
        .update_item_quantity(cart_id, item_id, 0)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

pub async fn clear_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state
        .services
        .carts
        .clear_cart(cart_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

pub async fn abandon_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let cart = state
        .services
        .carts
        .abandon_cart(cart_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}
