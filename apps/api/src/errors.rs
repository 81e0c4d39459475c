use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Pipeline-level error type covering every stage of
/// capture → classify → materialize.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, CaptureError>`.
///
/// Locally recoverable conditions (enrichment gaps, an entry that already
/// exists) are NOT errors — they travel through `MaterializeOutcome` instead.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Capture timed out after {0}s")]
    CaptureTimeout(u64),

    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Template error: {0}")]
    Template(#[from] crate::template::TemplateError),

    #[error("Write failure: {0}")]
    WriteFailure(#[from] std::io::Error),

    #[error("Submission cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for CaptureError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            CaptureError::InvalidIdentity(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_IDENTITY", msg.clone())
            }
            CaptureError::CaptureTimeout(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                "CAPTURE_TIMEOUT",
                format!("Capture timed out after {secs}s"),
            ),
            CaptureError::AuthFailure(msg) => {
                (StatusCode::UNAUTHORIZED, "AUTH_FAILURE", msg.clone())
            }
            CaptureError::Network(msg) => {
                tracing::error!("Network failure: {msg}");
                (StatusCode::BAD_GATEWAY, "NETWORK_FAILURE", msg.clone())
            }
            CaptureError::Template(e) => {
                tracing::error!("Template error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TEMPLATE_ERROR",
                    "A rendering error occurred".to_string(),
                )
            }
            CaptureError::WriteFailure(e) => {
                tracing::error!("Write failure: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "WRITE_FAILURE",
                    "Failed to write the note to the vault".to_string(),
                )
            }
            CaptureError::Cancelled => (
                StatusCode::REQUEST_TIMEOUT,
                "CANCELLED",
                "Submission was cancelled".to_string(),
            ),
            CaptureError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
