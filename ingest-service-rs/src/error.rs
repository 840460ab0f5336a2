//! Ingest Request Validation Errors
//!
//! Maps every per-request failure onto the wire contract: malformed or
//! rejected submissions answer 4xx (the client must fix, not retry), a
//! persistence failure answers 500 (the client may resubmit). Handlers
//! never panic; the serving process outlives every failed request.

use axum::http::StatusCode;
use axum::Json;

use pilot_ledger::TelemetryError;

/// Error response body, a single `error` field.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Per-request failure of the ingest boundary.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Feedback too long (max 1000 characters)")]
    MessageTooLong,

    #[error("Rating must be an integer between 1 and 5")]
    InvalidRating,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Failed to submit feedback")]
    Persistence(#[from] TelemetryError),
}

impl IngestError {
    /// Convert to HTTP status code and error response
    pub fn to_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        let status = match self {
            Self::MessageTooLong => StatusCode::BAD_REQUEST,
            Self::InvalidRating => StatusCode::BAD_REQUEST,
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
    }
}
