//! HTTP handlers for settlement-service.

pub mod settlements;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::services::get_metrics;
use crate::AppState;

/// Health check endpoint for liveness probes.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.db.health_check().await.is_ok();
    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if db_ok { "ok" } else { "degraded" },
            "service": "settlement-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Prometheus metrics endpoint.
pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
