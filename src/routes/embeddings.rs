//! Embeddings endpoint.
//!
//! Admission happens before the body is read: unadmitted connections hold
//! only headers, never a buffered payload, so backlog cannot grow memory.
//! The handler takes the raw request and parses after `acquire` succeeds.

use axum::{
    body::to_bytes,
    extract::{Request, State},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{EmbeddingsRequest, EmbeddingsResponse};

/// Create embeddings for one string or a batch of strings.
///
/// POST /v1/embeddings
///
/// Lifecycle: touch activity, wait for a gate permit, read + parse the body,
/// record stats, dispatch to the worker pool, respond. The permit is released
/// exactly once on every path: parse failures drop it here, and successful
/// dispatches carry it into the worker so a mid-compute disconnect cannot
/// free capacity early.
pub async fn create_embeddings(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<EmbeddingsResponse>, ApiError> {
    state.activity.touch();

    let permit = state.gate.acquire().await?;
    let queue_depth = state.gate.queue_depth();
    let waited = permit.waited();

    let bytes = to_bytes(request.into_body(), state.config.max_body_bytes)
        .await
        .map_err(|e| ApiError::ClientParse(e.to_string()))?;
    let parsed: EmbeddingsRequest =
        serde_json::from_slice(&bytes).map_err(|e| ApiError::ClientParse(e.to_string()))?;
    drop(bytes);

    state.stats.update(waited.as_secs_f64(), queue_depth);

    let inputs = parsed.input.into_vec();
    debug!(
        model = %parsed.model,
        inputs = inputs.len(),
        wait_ms = waited.as_millis() as u64,
        "embedding request admitted"
    );

    let vectors = state.pool.run(inputs, permit).await?;

    info!(
        model = %parsed.model,
        embeddings = vectors.len(),
        "embedding request completed"
    );
    Ok(Json(EmbeddingsResponse::new(parsed.model, vectors)))
}
