use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::ApiError,
    handlers::common::{created_response, map_service_error, no_content_response, success_response},
    services::finance::{
        CreateAccountInput, DoubleEntryInput, RecordTransactionInput, UpdateAccountInput,
    },
    AppState,
};

// ---- chart of accounts ----

pub async fn list_accounts(State(state): State<AppState>) -> Result<Response, ApiError> {
    let accounts = state
        .services
        .finance
        .list_accounts()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(accounts))
}

/// Accounts grouped by type, the shape the chart-of-accounts page renders
pub async fn accounts_by_type(State(state): State<AppState>) -> Result<Response, ApiError> {
    let groups = state
        .services
        .finance
        .accounts_by_type()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(groups))
}

pub async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let account = state
        .services
        .finance
        .get_account(account_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(account))
}

pub async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountInput>,
) -> Result<Response, ApiError> {
    let account = state
        .services
        .finance
        .create_account(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(account))
}

pub async fn update_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<UpdateAccountInput>,
) -> Result<Response, ApiError> {
    let account = state
        .services
        .finance
        .update_account(account_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(account))
}

pub async fn delete_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state
        .services
        .finance
        .delete_account(account_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

// ---- transactions ----

pub async fn record_transaction(
    State(state): State<AppState>,
    Json(payload): Json<RecordTransactionInput>,
) -> Result<Response, ApiError> {
    let transaction = state
        .services
        .finance
        .record_transaction(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(transaction))
}

/// Posts matching debit and credit legs atomically
pub async fn record_double_entry(
    State(state): State<AppState>,
    Json(payload): Json<DoubleEntryInput>,
) -> Result<Response, ApiError> {
    let posting = state
        .services
        .finance
        .record_double_entry(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(posting))
}

// ---- reports ----

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Date-ranged ledger for one account with a per-row running balance
pub async fn ledger_report(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Query(range): Query<LedgerQuery>,
) -> Result<Response, ApiError> {
    let report = state
        .services
        .finance
        .ledger_report(account_id, range.from, range.to)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(report))
}

/// Per-account debit/credit totals across the whole ledger
pub async fn account_balances(State(state): State<AppState>) -> Result<Response, ApiError> {
    let balances = state
        .services
        .finance
        .account_balances()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(balances))
}
