use crate::error::QueueError;
use thiserror::Error;

/// Storage-specific errors raised by [`QueueStore`](super::QueueStore)
/// implementations.
///
/// Every variant except `JobNotFound` is transient from the engine's point of
/// view: callers log it and keep their loop running.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The store is unreachable or refused the connection
    #[error("store unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored record could not be encoded or decoded
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// No record, status or dead-letter entry exists for the id
    #[error("job not found: #{id}")]
    JobNotFound { id: u64 },

    /// A store operation failed for a reason other than connectivity
    #[error("store operation failed: {operation} - {message}")]
    OperationFailed { operation: String, message: String },
}

impl StorageError {
    /// Create an unavailable error with a message
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create an unavailable error with a message and source error
    pub fn unavailable_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a job not found error
    pub fn job_not_found(id: u64) -> Self {
        Self::JobNotFound { id }
    }

    /// Create an operation failed error
    pub fn operation_failed<S: Into<String>, T: Into<String>>(operation: S, message: T) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

// Convert StorageError to QueueError for unified error handling
impl From<StorageError> for QueueError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::JobNotFound { id } => QueueError::JobNotFound { id },
            StorageError::Serialization { message } => QueueError::Serialization { message },
            _ => QueueError::Storage {
                message: err.to_string(),
            },
        }
    }
}
