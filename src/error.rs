//! Error types for amqp-route-proxy

use thiserror::Error;

/// Main error type for the proxy
#[derive(Error, Debug)]
pub enum ProxyError {
    /// I/O error (network, file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Wire protocol error (malformed frame, bad header)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Credential extraction error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Backend routing resolution failure
    #[error("Routing resolution error: {0}")]
    Resolution(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Distributed route store error
    #[error("Route store error: {0}")]
    Store(String),
}

/// Result type alias for ProxyError
pub type Result<T> = std::result::Result<T, ProxyError>;

impl From<serde_yaml::Error> for ProxyError {
    fn from(err: serde_yaml::Error) -> Self {
        ProxyError::Config(err.to_string())
    }
}

impl From<redis::RedisError> for ProxyError {
    fn from(err: redis::RedisError) -> Self {
        ProxyError::Store(err.to_string())
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::Resolution(err.to_string())
    }
}
