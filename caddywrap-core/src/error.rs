//! Error types for Caddywrap

use thiserror::Error;

/// Result type for Caddywrap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Caddywrap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),

    /// Error returned by a request handler
    #[error("Handler error: {0}")]
    Handler(String),

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
