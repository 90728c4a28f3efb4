// Error taxonomy for the relay
//
// Every variant is caught at the HTTP boundary and rendered as
// `500 { "error": "<message>" }`; nothing here is allowed to take the
// process down.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the relay core
pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed or missing request fields
    #[error("invalid request: {0}")]
    Validation(String),

    /// The context builder was missing a required payload or field
    #[error("missing required data: {0}")]
    MissingData(String),

    /// State was read before any context was set for the session
    #[error("no context has been set for session '{0}'")]
    SessionNotFound(String),

    /// Backend failure: network, auth, quota, malformed body or timeout
    #[error("generative backend request failed: {0}")]
    Upstream(String),

    /// Backend answered but carried no usable candidate
    #[error("generative backend returned no usable candidate")]
    UpstreamEmptyResponse,
}

impl RelayError {
    /// Short machine-readable label, used as a tracing field
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Validation(_) => "validation",
            RelayError::MissingData(_) => "missing_data",
            RelayError::SessionNotFound(_) => "session_not_found",
            RelayError::Upstream(_) => "upstream",
            RelayError::UpstreamEmptyResponse => "upstream_empty_response",
        }
    }
}

/// Body of every failed response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        tracing::warn!(kind = self.kind(), "{}", self);
        let body = ErrorBody {
            error: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
