//! Error types for linestore
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::limiter::AdmissionClass;
use crate::protocol::Status;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for linestore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error during {op} on {}: {source}", path.display())]
    IoAt {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("replace of {} failed after {attempts} attempts: {source}", path.display())]
    ReplaceRetryExhausted {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Malformed record line: {0}")]
    Decode(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot source missing: {}", .0.display())]
    SourceMissing(PathBuf),

    // -------------------------------------------------------------------------
    // Admission Errors
    // -------------------------------------------------------------------------
    #[error("Too many {class} requests, retry after {}ms", retry_after.as_millis())]
    RateExceeded {
        class: AdmissionClass,
        retry_after: Duration,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Shorthand for a missing record of the given kind
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Attach an operation name and path to an I/O error
    pub fn io_at(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoAt {
            op,
            path: path.into(),
            source,
        }
    }

    /// Transport-level classification of this error
    pub fn status(&self) -> Status {
        match self {
            Self::Decode(_) | Self::Validation(_) => Status::BadRequest,
            Self::NotFound { .. } => Status::NotFound,
            Self::RateExceeded { .. } => Status::TooManyRequests,
            Self::Io(_)
            | Self::IoAt { .. }
            | Self::ReplaceRetryExhausted { .. }
            | Self::Serialization(_)
            | Self::SourceMissing(_)
            | Self::Config(_) => Status::ServerError,
        }
    }

    /// Whether the caller may retry the same request later unchanged
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::RateExceeded { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
