use crate::services::metrics::get_metrics;
use crate::startup::AppState;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;

pub async fn root() -> &'static str {
    "FixGeni API is running"
}

/// Liveness. Never touches the store.
pub async fn health() -> &'static str {
    "ok"
}

pub async fn health_json(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "service": state.config.service_name,
        "version": state.config.service_version,
    }))
}

/// Readiness: the store answers a trivial query.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ready", "backend": state.store.backend().as_str() })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not_ready", "error": e.to_string() })),
            )
        }
    }
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        get_metrics(),
    )
}
