//! Common error types for the comparison service

use thiserror::Error;

/// Common result type for comparison operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the comparison service
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Comparison list already holds the maximum number of items
    #[error("Maximum products reached ({max})")]
    CapacityExceeded { max: usize },

    /// Missing session, bad anti-forgery token or insufficient capability
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures of the backing store rather than of the request
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Io(_) | Error::Serialization(_))
    }
}
