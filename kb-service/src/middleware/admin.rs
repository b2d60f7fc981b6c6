use crate::startup::AppState;
use anyhow::anyhow;
use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use serde_json::json;
use service_core::error::AppError;
use service_core::utils::{bearer_token, secrets_match};

pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Gate for `/api/admin`. Fails closed: with no secret configured every call
/// gets 503, otherwise the presented credential must match exactly.
pub async fn admin_gate_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(secret) = state.config.security.admin_secret.as_ref() else {
        tracing::warn!(
            path = %request.uri().path(),
            "Admin route called but SECURITY_SECRET_KEY is not configured"
        );
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ok": false, "reason": "Security not configured" })),
        )
            .into_response();
    };

    let headers = request.headers();
    let authorized = headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| bearer_token(headers))
        .is_some_and(|provided| secrets_match(provided, secret.expose_secret()));

    if !authorized {
        tracing::warn!(path = %request.uri().path(), "Rejected admin request");
        return AppError::Unauthorized(anyhow!("invalid or missing admin secret")).into_response();
    }

    next.run(request).await
}
