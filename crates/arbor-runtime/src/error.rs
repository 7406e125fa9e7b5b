//! Runtime error types.

use thiserror::Error;

/// Errors that can occur assembling or operating the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(#[from] arbor_config::ConfigError),

    /// Task pool error.
    #[error("task pool error: {0}")]
    TaskError(#[from] arbor_tasks::TaskError),

    /// Cache error.
    #[error("cache error: {0}")]
    CacheError(#[from] arbor_cache::CacheError),

    /// Capability error.
    #[error("capability error: {0}")]
    CapabilityError(#[from] arbor_capabilities::CapabilityError),

    /// Framework error surfaced outside a request.
    #[error("framework error: {0}")]
    FrameworkError(#[from] arbor_core::FrameworkError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
