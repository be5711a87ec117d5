use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the trading core.
///
/// Only `Config` is fatal, and only before the decision loop starts. Every
/// other variant is logged by the caller and the operation degrades.
#[derive(Debug, Error)]
pub enum TraderError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("exchange error: {0}")]
    Exchange(String),

    #[error("{operation} timed out after {limit:?}")]
    Timeout { operation: &'static str, limit: Duration },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for TraderError {
    fn from(err: config::ConfigError) -> Self {
        TraderError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TraderError>;
