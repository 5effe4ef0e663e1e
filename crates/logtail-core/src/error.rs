//! Error types for logtail.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in logtail.
#[derive(Debug, Error)]
pub enum Error {
    /// Tail request is missing a required field.
    #[error("invalid tail request: {0}")]
    InvalidRequest(String),

    /// No container instance matched the request.
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// The log stream could not be opened.
    #[error("log stream error: {0}")]
    Stream(String),

    /// The tail was cancelled before the log stream opened.
    #[error("tail cancelled before the log stream opened")]
    Cancelled,

    /// Docker error.
    #[error("docker error: {0}")]
    Docker(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
