//! Error types for the HTTP layer
//!
//! Every failure, injected or real, leaves the server in the same envelope:
//! `{ success: false, error, message, details?, timestamp, requestId }`.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use datamock_core::fault::ErrorCategory;
use datamock_core::{CoreError, ValidationReport};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::api::response::now_timestamp;
use crate::middleware::current_request_id;

/// Result type for handlers
pub type Result<T> = std::result::Result<T, ApiError>;

/// Error type for the HTTP layer
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed query parameter
    #[error("{0}")]
    InvalidParameter(String),

    /// Schema failed validation
    #[error("Schema validation failed: {0}")]
    SchemaValidation(ValidationReport),

    /// Malformed request body
    #[error("{0}")]
    BadRequest(String),

    /// Rejected fault or engine configuration
    #[error("{0}")]
    InvalidConfig(String),

    /// Unknown dataset or route
    #[error("{0}")]
    NotFound(String),

    /// Missing or wrong API key
    #[error("Missing or invalid API key")]
    Unauthorized,

    /// Deliberately injected failure
    #[error("{}", .0.message)]
    Injected(ErrorCategory),

    /// Anything else
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidParameter(_)
            | ApiError::SchemaValidation(_)
            | ApiError::BadRequest(_)
            | ApiError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Injected(category) => StatusCode::from_u16(category.status_code)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for the `error` field
    pub fn code(&self) -> String {
        match self {
            ApiError::InvalidParameter(_) => "INVALID_PARAMETER".to_string(),
            ApiError::SchemaValidation(_) => "SCHEMA_VALIDATION_FAILED".to_string(),
            ApiError::BadRequest(_) => "BAD_REQUEST".to_string(),
            ApiError::InvalidConfig(_) => "INVALID_CONFIG".to_string(),
            ApiError::NotFound(_) => "NOT_FOUND".to_string(),
            ApiError::Unauthorized => "UNAUTHORIZED".to_string(),
            ApiError::Injected(category) => category.error_code(),
            ApiError::Internal(_) => "INTERNAL_ERROR".to_string(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ApiError::SchemaValidation(report) => Some(json!(report.errors)),
            _ => None,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidSchema(report) => ApiError::SchemaValidation(report),
            CoreError::ConfigError(message) => ApiError::InvalidConfig(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    timestamp: String,
    request_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            success: false,
            error: self.code(),
            message: self.to_string(),
            details: self.details(),
            timestamp: now_timestamp(),
            request_id: current_request_id(),
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(&self, ApiError::Injected(category) if category.is_rate_limit()) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}
