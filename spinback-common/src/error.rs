//! Common error types for Spinback

use thiserror::Error;

/// Common result type for Spinback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Spinback crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure talking to a remote service
    #[error("Network error: {0}")]
    Network(String),

    /// Remote service answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Missing or expired bearer token
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Parse(err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }
}
