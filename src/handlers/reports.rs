use axum::{
    extract::{Query, State},
    response::Response,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;

use crate::{
    errors::ApiError,
    handlers::common::{map_service_error, success_response},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

/// Monthly earnings, top sellers, and stock totals in one call
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> Result<Response, ApiError> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let dashboard = state
        .services
        .reports
        .dashboard(year)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(dashboard))
}

pub async fn monthly_earnings(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> Result<Response, ApiError> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let earnings = state
        .services
        .reports
        .monthly_earnings(year)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(earnings))
}

#[derive(Debug, Deserialize)]
pub struct TopProductsQuery {
    pub limit: Option<usize>,
}

pub async fn top_products(
    State(state): State<AppState>,
    Query(query): Query<TopProductsQuery>,
) -> Result<Response, ApiError> {
    let limit = query.limit.unwrap_or(5).min(50);
    let products = state
        .services
        .reports
        .top_selling_products(limit)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(products))
}
