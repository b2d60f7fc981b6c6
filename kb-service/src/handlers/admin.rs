use crate::services::maintenance::{self, MaintenanceOp, MaintenanceReport};
use crate::startup::AppState;
use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use service_core::error::AppError;

pub async fn gate() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub async fn list_ops() -> Json<Value> {
    let ops: Vec<Value> = MaintenanceOp::ALL
        .iter()
        .map(|op| json!({ "name": op.as_str(), "description": op.description() }))
        .collect();
    Json(json!({ "ops": ops }))
}

pub async fn run_op(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MaintenanceReport>, AppError> {
    let op = MaintenanceOp::from_str(&name)
        .ok_or_else(|| AppError::NotFound(anyhow!("unknown maintenance op '{}'", name)))?;

    tracing::info!(op = op.as_str(), "Admin-triggered maintenance op");
    let report = maintenance::run_op(op, state.store.as_ref(), &state.seeder).await?;
    Ok(Json(report))
}
