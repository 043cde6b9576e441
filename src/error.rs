//! Error types for chwire.

use thiserror::Error;

use crate::types::TypeError;

/// The main error type for connection-level operations.
#[derive(Debug, Error)]
pub enum WireError {
    /// Transport write or flush failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Codec resolution or value encoding failed.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// The block compressor rejected a block.
    #[error("Block compression failed: {0}")]
    Compression(#[source] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WireError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type alias for chwire operations.
pub type WireResult<T> = Result<T, WireError>;
