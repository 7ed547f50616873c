//! Health and metrics endpoints.
//!
//! Neither endpoint touches the request gate: a saturated gate must never
//! make the process look dead.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::reclaim::resident_set_bytes;
use crate::state::AppState;

/// Health check endpoint
///
/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Gate and runtime snapshot
///
/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "gate": {
            "capacity": state.gate.capacity(),
            "available_permits": state.gate.available_permits(),
            "queue_depth": state.gate.queue_depth(),
        },
        "config": {
            "micro_batch": state.config.micro_batch,
            "workers": state.config.workers,
            "idle_threshold_secs": state.config.idle_threshold.as_secs(),
        },
        "memory": {
            "rss_bytes": resident_set_bytes(),
        },
        "idle_secs": state.activity.idle_for().as_secs(),
    }))
}
