//! Error types for batch-export
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Errors fall in two groups. Run-level errors (`Config`, `Source`,
//! `RunCancelled`) end a run. Batch-level errors (`Serialization`,
//! `SinkUnavailable`, `SinkRejected`, `Staging`) stay inside the batch that
//! raised them and are recorded in that batch's result.

use serde::Serialize;
use thiserror::Error;

/// The main error type for batch-export
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Source Errors
    // ============================================================================
    #[error("Source error: {message}")]
    Source { message: String },

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    // ============================================================================
    // Batch Errors
    // ============================================================================
    #[error("Cannot serialize value of type '{type_name}': no handler registered")]
    Serialization { type_name: String },

    #[error("Staging error: {message}")]
    Staging { message: String },

    #[error("Sink unavailable: {message}")]
    SinkUnavailable { message: String },

    #[error("Sink rejected write: {message}")]
    SinkRejected { message: String },

    // ============================================================================
    // Run Errors
    // ============================================================================
    #[error("Run cancelled after {completed} of {attempted} batches")]
    RunCancelled { attempted: usize, completed: usize },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a source error
    pub fn source_error(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    /// Create a serialization error naming the unsupported type
    pub fn serialization(type_name: impl Into<String>) -> Self {
        Self::Serialization {
            type_name: type_name.into(),
        }
    }

    /// Create a staging error
    pub fn staging(message: impl Into<String>) -> Self {
        Self::Staging {
            message: message.into(),
        }
    }

    /// Create a transient sink error
    pub fn sink_unavailable(message: impl Into<String>) -> Self {
        Self::SinkUnavailable {
            message: message.into(),
        }
    }

    /// Create a permanent sink error
    pub fn sink_rejected(message: impl Into<String>) -> Self {
        Self::SinkRejected {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::SinkUnavailable { .. })
    }

    /// Classify this error for a batch result
    pub fn batch_kind(&self) -> BatchErrorKind {
        match self {
            Error::Serialization { .. } | Error::JsonParse(_) => BatchErrorKind::Serialization,
            Error::SinkUnavailable { .. } => BatchErrorKind::SinkUnavailable,
            Error::SinkRejected { .. } => BatchErrorKind::SinkRejected,
            Error::Staging { .. } | Error::Io(_) => BatchErrorKind::Staging,
            _ => BatchErrorKind::Other,
        }
    }
}

/// Kind of failure recorded against a single batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchErrorKind {
    /// The page could not be rendered
    Serialization,
    /// The staging area could not be written or read
    Staging,
    /// The sink failed transiently and retries were exhausted
    SinkUnavailable,
    /// The sink refused the payload
    SinkRejected,
    /// The batch task panicked or failed otherwise
    Other,
}

/// Result type alias for batch-export
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::serialization("interval");
        assert_eq!(
            err.to_string(),
            "Cannot serialize value of type 'interval': no handler registered"
        );

        let err = Error::RunCancelled {
            attempted: 5,
            completed: 2,
        };
        assert_eq!(err.to_string(), "Run cancelled after 2 of 5 batches");
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::sink_unavailable("503").is_retryable());

        assert!(!Error::sink_rejected("403").is_retryable());
        assert!(!Error::serialization("blob").is_retryable());
        assert!(!Error::config("test").is_retryable());
    }

    #[test]
    fn test_batch_kind() {
        assert_eq!(
            Error::serialization("x").batch_kind(),
            BatchErrorKind::Serialization
        );
        assert_eq!(
            Error::sink_unavailable("x").batch_kind(),
            BatchErrorKind::SinkUnavailable
        );
        assert_eq!(
            Error::sink_rejected("x").batch_kind(),
            BatchErrorKind::SinkRejected
        );
        assert_eq!(Error::staging("x").batch_kind(), BatchErrorKind::Staging);
        assert_eq!(Error::Other("x".into()).batch_kind(), BatchErrorKind::Other);
    }
}
