use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::Deserialize;

use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    handlers::common::{
        clamp_pagination, created_response, map_service_error, no_content_response,
        success_response, PaginatedResponse, PaginationParams,
    },
    services::blog::{CreatePostInput, UpdatePostInput},
    AppState,
};

// ---- categories and tags ----

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Response, ApiError> {
    let categories = state
        .services
        .blog
        .list_categories()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<NameRequest>,
) -> Result<Response, ApiError> {
    let category = state
        .services
        .blog
        .create_category(payload.name)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(category))
}

pub async fn list_tags(State(state): State<AppState>) -> Result<Response, ApiError> {
    let tags = state
        .services
        .blog
        .list_tags()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(tags))
}

pub async fn create_tag(
    State(state): State<AppState>,
    Json(payload): Json<NameRequest>,
) -> Result<Response, ApiError> {
    let tag = state
        .services
        .blog
        .create_tag(payload.name)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(tag))
}

// ---- posts ----

pub async fn list_published(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ApiError> {
    let (page, per_page) = clamp_pagination(pagination.page, pagination.per_page);
    let (posts, total) = state
        .services
        .blog
        .list_published(page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        posts, page, per_page, total,
    )))
}

pub async fn get_post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let detail = state
        .services
        .blog
        .get_post_by_slug(&slug)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

/// Creates a post authored by the authenticated user
pub async fn create_post(
    State(state): State<AppState>,
    author: AuthenticatedUser,
    Json(payload): Json<CreatePostInput>,
) -> Result<Response, ApiError> {
    let post = state
        .services
        .blog
        .create_post(author.id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(post))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<UpdatePostInput>,
) -> Result<Response, ApiError> {
    let post = state
        .services
        .blog
        .update_post(&slug, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    state
        .services
        .blog
        .delete_post(&slug)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

pub async fn publish_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let post = state
        .services
        .blog
        .set_published(&slug, true)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(post))
}

pub async fn unpublish_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let post = state
        .services
        .blog
        .set_published(&slug, false)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(post))
}

// ---- comments ----

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

/// Adds a comment; visitors may comment anonymously
pub async fn add_comment(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    author: Option<axum::Extension<AuthenticatedUser>>,
    Json(payload): Json<CommentRequest>,
) -> Result<Response, ApiError> {
    let author_id = author.map(|ext| ext.0.id);
    let comment = state
        .services
        .blog
        .add_comment(&slug, author_id, payload.content)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(comment))
}
