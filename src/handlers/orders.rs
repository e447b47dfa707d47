use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    entities::order::OrderStatus,
    errors::{ApiError, ServiceError},
    handlers::common::{clamp_pagination, map_service_error, success_response, PaginatedResponse},
    AppState,
};

fn parse_status(status: &str) -> Result<OrderStatus, ServiceError> {
    match status.to_ascii_lowercase().as_str() {
        "pending" => Ok(OrderStatus::Pending),
        "processed" => Ok(OrderStatus::Processed),
        "shipped" => Ok(OrderStatus::Shipped),
        "delivered" => Ok(OrderStatus::Delivered),
        "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
        other => Err(ServiceError::InvalidStatus(format!(
            "Unknown order status: {other}"
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Response, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(parse_status)
        .transpose()
        .map_err(map_service_error)?;
    let (page, per_page) = clamp_pagination(query.page.unwrap_or(1), query.per_page.unwrap_or(20));

    let (orders, total) = state
        .services
        .orders
        .list_orders(status, page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        orders, page, per_page, total,
    )))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .orders
        .get_order(order_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

pub async fn get_order_by_number(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .orders
        .get_order_by_number(&order_number)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize)]
pub struct CustomerOrdersQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

pub async fn list_for_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Query(query): Query<CustomerOrdersQuery>,
) -> Result<Response, ApiError> {
    let (page, per_page) = clamp_pagination(query.page.unwrap_or(1), query.per_page.unwrap_or(20));
    let (orders, total) = state
        .services
        .orders
        .list_for_customer(customer_id, page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        orders, page, per_page, total,
    )))
}

// ---- lifecycle transitions ----

pub async fn process_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .orders
        .process_order(order_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize, Default)]
pub struct ShipRequest {
    pub tracking_number: Option<String>,
}

pub async fn mark_shipped(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    payload: Option<Json<ShipRequest>>,
) -> Result<Response, ApiError> {
    let tracking = payload.and_then(|Json(body)| body.tracking_number);
    let order = state
        .services
        .orders
        .mark_shipped(order_id, tracking)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

pub async fn mark_delivered(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .orders
        .mark_delivered(order_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// Cancels an unshipped order and restocks its lines
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .orders
        .cancel_order(order_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_parse_case_insensitively() {
        assert_eq!(parse_status("Pending").unwrap(), OrderStatus::Pending);
        assert_eq!(parse_status("SHIPPED").unwrap(), OrderStatus::Shipped);
        assert_eq!(parse_status("canceled").unwrap(), OrderStatus::Cancelled);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(parse_status("refunded").is_err());
    }
}
