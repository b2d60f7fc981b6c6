use crate::dtos::{ArticleListParams, ArticleListResponse, ArticleResponse};
use crate::models::ArticleQuery;
use crate::startup::AppState;
use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use service_core::error::AppError;

pub async fn list_articles(
    State(state): State<AppState>,
    Query(params): Query<ArticleListParams>,
) -> Result<Json<ArticleListResponse>, AppError> {
    let page = params.page_request();
    let status = params
        .status_filter()
        .map_err(|e| AppError::BadRequest(anyhow!(e)))?;

    let (items, total) = state
        .store
        .list_articles(ArticleQuery {
            status,
            limit: page.page_size,
            offset: page.offset(),
        })
        .await?;

    Ok(Json(ArticleListResponse {
        items,
        page: page.page,
        page_size: page.page_size,
        total,
    }))
}

pub async fn get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ArticleResponse>, AppError> {
    state
        .store
        .find_article_by_slug(&slug)
        .await?
        .map(|article| Json(ArticleResponse { article }))
        .ok_or_else(|| AppError::NotFound(anyhow!("not_found")))
}
