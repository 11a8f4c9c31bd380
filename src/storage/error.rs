//! Chain storage error types
//!
//! Every failure on the write path surfaces as a `ChainError` so the host
//! decides whether to abort or degrade.

use thiserror::Error;

/// Errors that can occur while persisting or loading chains
#[derive(Error, Debug)]
pub enum ChainError {
    /// I/O operation failed (missing chain file, permission, disk full)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding of blocks failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No chain is registered under the requested name
    #[error("Chain not found: {0}")]
    ChainNotFound(String),

    /// The background flush task stopped abnormally
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Serialization(err.to_string())
    }
}

/// Result type alias for chain operations
pub type ChainResult<T> = Result<T, ChainError>;
