//! Error taxonomy (spec §7). Adapter-level errors never bubble past the
//! engine; only engine-fatal errors reach the API layer as 500/503.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaddockError {
    #[error("bot detection signature matched for {adapter}")]
    BotDetection { adapter: String },

    #[error("network error for {adapter}: {reason}")]
    Network { adapter: String, reason: String },

    #[error("structure change in {adapter}: {reason}")]
    StructureChange { adapter: String, reason: String },

    #[error("authentication failed for {adapter}")]
    Authentication { adapter: String },

    #[error("configuration error for {adapter}: {reason}")]
    Configuration { adapter: String, reason: String },

    #[error("parsing error in {adapter}: {reason}")]
    Parsing { adapter: String, reason: String },

    #[error("timeout for {adapter} after {timeout_secs}s")]
    Timeout { adapter: String, timeout_secs: u64 },

    #[error("unexpected error in {adapter}: {reason}")]
    Unknown { adapter: String, reason: String },

    #[error("http error {status} for {url}")]
    Http { status: u16, url: String },

    #[error("engine failure: {0}")]
    EngineFatal(String),
}

impl PaddockError {
    pub fn adapter(&self) -> Option<&str> {
        match self {
            PaddockError::BotDetection { adapter }
            | PaddockError::Network { adapter, .. }
            | PaddockError::StructureChange { adapter, .. }
            | PaddockError::Authentication { adapter }
            | PaddockError::Configuration { adapter, .. }
            | PaddockError::Parsing { adapter, .. }
            | PaddockError::Timeout { adapter, .. }
            | PaddockError::Unknown { adapter, .. } => Some(adapter),
            PaddockError::Http { .. } | PaddockError::EngineFatal(_) => None,
        }
    }

    /// Whether this error kind is retried by the adapter framework (spec §4.2.2).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaddockError::Network { .. } | PaddockError::Timeout { .. }
        )
    }
}

/// Only engine-fatal errors are converted at the API boundary; adapter
/// errors are always folded into `source_info` instead (spec §7).
impl IntoResponse for PaddockError {
    fn into_response(self) -> Response {
        let status = match &self {
            PaddockError::EngineFatal(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "error": "internal_error",
            "message": "The request could not be completed.",
        }));
        (status, body).into_response()
    }
}
