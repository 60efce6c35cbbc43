//! Error types for the state store.

use thiserror::Error;

/// Errors surfaced by store operations.
///
/// Reads never fail: a missing or malformed path reads as `None`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Malformed input to a write operation.
    #[error("{operation}: invalid argument: {message}")]
    InvalidArgument {
        operation: &'static str,
        message: String,
    },

    /// A sub-store was added at a path that already holds a value.
    #[error("sub-store already exists at '{path}'")]
    AlreadyExists { path: String },

    /// A typed value could not be converted to or from a `Value`.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl Error {
    pub(crate) fn invalid_argument(operation: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            operation,
            message: message.into(),
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;
