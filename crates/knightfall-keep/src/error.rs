//! Error types for the keep node.

use thiserror::Error;

/// Result type for keep operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in keep operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Session error
    #[error(transparent)]
    Session(#[from] knightfall_session::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<Error> for knightfall_session::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Session(inner) => inner,
            Error::Serialization(inner) => knightfall_session::Error::Serialization(inner),
            other => knightfall_session::Error::Cache(other.to_string()),
        }
    }
}
