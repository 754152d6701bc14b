//! Error taxonomy for the monitor.
//!
//! Store adapters report [`StoreError`]; everything the HTTP surface can
//! return is an [`ApiError`], mapped once to a status code in
//! [`IntoResponse`]. The request path and method are added to the envelope
//! by [`crate::routes`]'s error middleware, which reads the [`ErrorReport`]
//! extension left on the response.

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::RecordError;

// ---

/// Failures surfaced by a [`crate::store::RecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error(transparent)]
    Schema(#[from] RecordError),

    #[error("store query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        // ---
        match err {
            sqlx::Error::PoolTimedOut => StoreError::Timeout { timeout_ms: 0 },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Protocol(_) => StoreError::Unavailable(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Query(format!("row decode failed: {err}"))
            }
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// Errors returned by handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid '{field}' date format, expected ISO 8601: '{value}'")]
    InvalidDateFormat { field: &'static str, value: String },

    #[error("'from' must not be later than 'to'")]
    InvalidDateRange,

    #[error("'limit' must be an integer between {min} and {max}, got '{value}'")]
    InvalidLimit { value: String, min: u32, max: u32 },

    #[error("invalid value '{value}' for '{name}'")]
    InvalidParameter { name: &'static str, value: String },

    #[error("{0}")]
    InvalidQuery(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    SchemaViolation(RecordError),

    #[error("{0}")]
    StoreUnavailable(String),

    #[error("store call timed out after {timeout_ms}ms")]
    StoreTimeout { timeout_ms: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(detail) => ApiError::StoreUnavailable(detail),
            StoreError::Timeout { timeout_ms } => ApiError::StoreTimeout { timeout_ms },
            StoreError::Schema(record) => ApiError::SchemaViolation(record),
            StoreError::Query(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidQuery(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        // ---
        match self {
            ApiError::InvalidDateFormat { .. }
            | ApiError::InvalidDateRange
            | ApiError::InvalidLimit { .. }
            | ApiError::InvalidParameter { .. }
            | ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::SchemaViolation(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::StoreUnavailable(_) | ApiError::StoreTimeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    /// Message safe to hand to clients. Store and internal details stay in
    /// the server log.
    pub fn client_message(&self) -> String {
        // ---
        match self {
            ApiError::SchemaViolation(_) => {
                "Stored data does not conform to the expected schema".to_string()
            }
            ApiError::StoreUnavailable(_) | ApiError::StoreTimeout { .. } => {
                "Data store temporarily unavailable".to_string()
            }
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<Value> {
        // ---
        match self {
            ApiError::InvalidDateFormat { field, value } => {
                Some(json!({ "field": field, "value": value }))
            }
            ApiError::InvalidLimit { value, min, max } => {
                Some(json!({ "field": "limit", "value": value, "min": min, "max": max }))
            }
            ApiError::InvalidParameter { name, value } => {
                Some(json!({ "field": name, "value": value }))
            }
            ApiError::SchemaViolation(record) => {
                Some(json!({ "entity": record.entity, "id": record.id }))
            }
            _ => None,
        }
    }
}

/// Error summary attached to the response for the envelope middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl ErrorReport {
    /// Render the full error envelope.
    pub fn envelope(&self, path: &str, method: &str) -> Value {
        // ---
        let mut error = json!({
            "message": self.message,
            "statusCode": self.status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "path": path,
            "method": method,
        });
        if let Some(details) = &self.details {
            error["details"] = details.clone();
        }
        json!({ "error": error })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let report = ErrorReport {
            status,
            message: self.client_message(),
            details: self.details(),
        };
        let body = report.envelope("", "");

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(report);
        response
    }
}
