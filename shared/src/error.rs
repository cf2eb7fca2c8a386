//! Error types for the shared crate
//!
//! Failures reported by the data-access layer (fetch, refetch, mutate).
//! The core never retries; these are surfaced unchanged to the caller.

use thiserror::Error;

/// Data-access error
#[derive(Debug, Error)]
pub enum DataError {
    /// Transport failed before a response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// Entity does not exist on the server
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server rejected a create/update mutation
    #[error("Mutation rejected: {message}")]
    Rejected {
        message: String,
        /// Server-provided error code, if any
        code: Option<String>,
    },

    /// Response could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The underlying query or stream was closed
    #[error("Query closed")]
    Closed,
}

impl DataError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
            code: None,
        }
    }

    /// Whether resubmitting the same input may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Closed)
    }
}

/// Result type for data-access operations
pub type DataResult<T> = Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = DataError::rejected("name must not be empty");
        assert_eq!(err.to_string(), "Mutation rejected: name must not be empty");
        assert!(!err.is_retryable());
        assert!(DataError::network("timeout").is_retryable());
    }

    #[test]
    fn test_from_serde() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: DataError = parse.unwrap_err().into();
        assert!(matches!(err, DataError::Decode(_)));
    }
}
