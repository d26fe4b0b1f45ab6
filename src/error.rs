//! Error types for backburner.
//!
//! This module provides the crate-wide error taxonomy, using the thiserror
//! crate for ergonomic error handling. Execution failures and timeouts are
//! deliberately *not* represented here: they are normal outcomes routed
//! through the retry controller, not errors.

use thiserror::Error;

/// The main error type for queue engine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
    /// No job with the given id exists where the caller looked
    #[error("job not found: #{id}")]
    JobNotFound { id: u64 },

    /// Serialization/deserialization of a stored record failed
    #[error("serialization failed: {message}")]
    Serialization { message: String },

    /// The durable queue store is unreachable or an operation on it failed
    #[error("store error: {message}")]
    Storage { message: String },

    /// Invalid engine configuration
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The server was asked to start while already running
    #[error("server is already running")]
    AlreadyRunning,
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Serialization {
            message: err.to_string(),
        }
    }
}

/// A specialized Result type for queue engine operations.
pub type Result<T> = std::result::Result<T, QueueError>;
