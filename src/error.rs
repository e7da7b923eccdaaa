//! Error types for websocket-stat.

use thiserror::Error;

/// Errors raised outside the frame/template core, which itself never fails.
#[derive(Debug, Error)]
pub enum StatError {
    /// I/O error on a socket or the log file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration parsed but is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::http::Error),

    /// Upgrade request without `Sec-WebSocket-Key`.
    #[error("missing Sec-WebSocket-Key header")]
    MissingKey,

    /// Upstream refused or broke the upgrade.
    #[error("upstream error: {0}")]
    Upstream(String),
}

/// Result type alias using StatError.
pub type Result<T> = std::result::Result<T, StatError>;
