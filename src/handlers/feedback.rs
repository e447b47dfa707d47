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
        validate_input, PaginatedResponse, PaginationParams,
    },
    services::feedback::SubmitFeedbackInput,
    AppState,
};

/// Public feedback form submission
pub async fn submit(
    State(state): State<AppState>,
    Json(payload): Json<SubmitFeedbackInput>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let entry = state
        .services
        .feedback
        .submit(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(entry))
}

pub async fn list(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ApiError> {
    let (page, per_page) = clamp_pagination(pagination.page, pagination.per_page);
    let (entries, total) = state
        .services
        .feedback
        .list(page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        entries, page, per_page, total,
    )))
}

pub async fn mark_reviewed(
    State(state): State<AppState>,
    Path(feedback_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let entry = state
        .services
        .feedback
        .mark_reviewed(feedback_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entry))
}
