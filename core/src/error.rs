//! Error types for the core crate
//!
//! Range problems in batch requests are not errors: they degrade to empty or
//! clamped results. What remains is configuration and schema trouble, plus
//! IO and JSON errors from loading either.

use std::io;
use thiserror::Error;

use crate::schema::ValidationReport;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Schema failed validation
    #[error("Schema validation failed: {0}")]
    InvalidSchema(ValidationReport),

    /// Fault or engine configuration is malformed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for the core crate
pub type Result<T> = std::result::Result<T, CoreError>;
