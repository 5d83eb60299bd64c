//! Error types for stowage.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Input errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Archive errors
    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Dependency error: {0}")]
    Dependency(String),

    // Object store errors
    #[error("Store error during {operation} of {location}: {message}")]
    Store {
        operation: String,
        location: String,
        message: String,
    },

    // Cache errors
    #[error("Cache miss for key: {0}")]
    CacheMiss(String),

    // Infrastructure errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a store error tagged with the failing operation and object location.
    pub fn store(
        operation: impl Into<String>,
        location: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Error::Store {
            operation: operation.into(),
            location: location.into(),
            message: message.to_string(),
        }
    }

    /// Whether the caller may retry the whole operation.
    ///
    /// Only remote store failures qualify; everything else is deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Store { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
