use crate::dtos::{CategoryListParams, CategoryListResponse, CreateCategoryRequest};
use crate::models::{Category, CategoryFilter};
use crate::startup::AppState;
use anyhow::anyhow;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use service_core::error::AppError;
use validator::Validate;

pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<CategoryListParams>,
) -> Result<Json<CategoryListResponse>, AppError> {
    let filter = CategoryFilter {
        active_only: params.active_only(),
    };
    let items = state.store.list_categories(filter).await?;

    Ok(Json(CategoryListResponse {
        total: items.len(),
        items,
    }))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    req.validate()?;

    let input = req
        .into_input()
        .ok_or_else(|| AppError::BadRequest(anyhow!("slug must contain letters or digits")))?;

    match state.store.create_category(&input).await? {
        Some(category) => Ok((StatusCode::CREATED, Json(category))),
        None => Err(AppError::Conflict(anyhow!("slug already exists"))),
    }
}
