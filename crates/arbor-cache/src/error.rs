//! Cache error types.

use thiserror::Error;

/// Errors that can occur in cache operations.
///
/// Corruption of on-disk state is never surfaced to callers; it is
/// recovered locally (fresh defaults for one item, a namespace reset for
/// a bad index) and logged.
#[derive(Debug, Error)]
pub enum CacheError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
