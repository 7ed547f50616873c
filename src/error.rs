//! Error types for the embeddings server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::compute::ComputeError;

/// Non-standard status used by reverse proxies when the client went away.
/// Returned for bodies that fail to arrive or parse after admission.
pub fn client_closed_status() -> StatusCode {
    StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Request-path error surface.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or truncated body discovered after admission
    #[error("invalid request body: {0}")]
    ClientParse(String),

    /// The compute backend failed; never retried
    #[error(transparent)]
    Compute(#[from] ComputeError),

    /// The gate refused admission (server shutting down)
    #[error(transparent)]
    Gate(#[from] crate::gate::GateError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            // Mid-body disconnects and malformed payloads share the
            // client-closed convention; there is nobody left to answer.
            ApiError::ClientParse(_) => client_closed_status(),
            ApiError::Compute(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Gate(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
