//! Error types for gerrit-mcp.

use thiserror::Error;

/// Main error type for gerrit-mcp operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication or authorization rejected (401/403)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// API returned an error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response payload could not be interpreted
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Tool arguments rejected before any remote call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// External sync command failed
    #[error("Sync error: {0}")]
    Sync(String),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Classify a non-success HTTP status with the upstream message.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Error::Auth(message),
            404 => Error::NotFound(message),
            _ => Error::Api { status, message },
        }
    }

    /// Human-readable failure detail.
    ///
    /// Errors carrying an upstream message yield that message verbatim;
    /// everything else falls back to the error's own display text.
    pub fn detail(&self) -> String {
        match self {
            Error::Auth(message) | Error::NotFound(message) | Error::Api { message, .. }
                if !message.is_empty() =>
            {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for gerrit-mcp operations.
pub type Result<T> = std::result::Result<T, Error>;
