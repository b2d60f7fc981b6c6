use crate::dtos::{SeedResponse, SeedStatusResponse};
use crate::services::SeedTrigger;
use crate::startup::AppState;
use axum::{Json, extract::State};
use service_core::error::AppError;

/// Current store state; never triggers a pass.
pub async fn seed_status(
    State(state): State<AppState>,
) -> Result<Json<SeedStatusResponse>, AppError> {
    let category_count = state.store.count_categories().await?;
    let latest = state.store.latest_category().await?;

    Ok(Json(SeedStatusResponse {
        category_count,
        latest,
    }))
}

pub async fn trigger_seed(State(state): State<AppState>) -> Result<Json<SeedResponse>, AppError> {
    tracing::info!("Admin-triggered seed requested");
    let report = state.seeder.run(SeedTrigger::Admin).await?;
    Ok(Json(report.into()))
}
