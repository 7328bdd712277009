//! Error types for the sentinel listener

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, SentinelError>;

#[derive(Debug, Error)]
pub enum SentinelError {
    /// Malformed config, address, ABI or unknown event name. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("ABI load error: {0}")]
    AbiLoad(String),

    /// RPC endpoint unreachable, dropped, or serving the wrong chain
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Rendering error: {0}")]
    Rendering(String),
}

impl From<config::ConfigError> for SentinelError {
    fn from(e: config::ConfigError) -> Self {
        SentinelError::Configuration(e.to_string())
    }
}
