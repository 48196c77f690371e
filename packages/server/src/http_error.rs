//! HTTP error handling for the tree server
//!
//! Provides consistent JSON error bodies. The HTTP client parses the same
//! structure back into `ApiError::Server`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use treestage_core::TreeServiceError;

pub const NODE_NOT_FOUND: &str = "NODE_NOT_FOUND";
pub const CONSISTENCY_VIOLATION: &str = "CONSISTENCY_VIOLATION";
pub const INVALID_CHANGE_SET: &str = "INVALID_CHANGE_SET";
pub const DATABASE_ERROR: &str = "DATABASE_ERROR";

/// HTTP error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information for debugging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    /// Convert from anyhow::Error, keeping the debug chain as details
    pub fn from_anyhow(err: anyhow::Error, code: impl Into<String>) -> Self {
        Self {
            message: err.to_string(),
            code: code.into(),
            details: Some(format!("{:?}", err)),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            NODE_NOT_FOUND => StatusCode::NOT_FOUND,
            CONSISTENCY_VIOLATION => StatusCode::CONFLICT,
            INVALID_CHANGE_SET => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<TreeServiceError> for HttpError {
    fn from(err: TreeServiceError) -> Self {
        match err {
            TreeServiceError::NodeNotFound { .. } => HttpError::new(err.to_string(), NODE_NOT_FOUND),
            TreeServiceError::ConsistencyViolation(_) => {
                tracing::warn!("Rejected change set: {}", err);
                HttpError::new(err.to_string(), CONSISTENCY_VIOLATION)
            }
            TreeServiceError::InvalidChangeSet(_) => {
                HttpError::new(err.to_string(), INVALID_CHANGE_SET)
            }
            TreeServiceError::Database(e) => {
                tracing::error!("Database failure: {}", e);
                HttpError::with_details("Database operation failed", DATABASE_ERROR, e.to_string())
            }
            TreeServiceError::Store(e) => {
                tracing::error!("Store failure: {:?}", e);
                HttpError::from_anyhow(e, DATABASE_ERROR)
            }
        }
    }
}
