//! Client error types

use thiserror::Error;

/// Failure of a single transport call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server rejected the session credentials (HTTP 401)
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
