use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;

use crate::{
    errors::ApiError,
    handlers::common::{
        clamp_pagination, created_response, map_service_error, success_response,
        PaginatedResponse, PaginationParams,
    },
    services::expenses::CreateExpenseInput,
    AppState,
};

pub async fn create_expense(
    State(state): State<AppState>,
    Json(payload): Json<CreateExpenseInput>,
) -> Result<Response, ApiError> {
    let expense = state
        .services
        .expenses
        .create_expense(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(expense))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ApiError> {
    let (page, per_page) = clamp_pagination(pagination.page, pagination.per_page);
    let (expenses, total) = state
        .services
        .expenses
        .list_expenses(page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        expenses, page, per_page, total,
    )))
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub year: Option<i32>,
}

/// Twelve per-month totals, defaulting to the current year
pub async fn monthly_totals(
    State(state): State<AppState>,
    Query(query): Query<MonthlyQuery>,
) -> Result<Response, ApiError> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let totals = state
        .services
        .expenses
        .monthly_totals(year)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(totals))
}
