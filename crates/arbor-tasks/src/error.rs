//! Task pool error types.

use thiserror::Error;

/// Errors that can occur while building or using the task pool.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The pool was constructed with an unusable worker split.
    #[error("invalid pool sizing: {0}")]
    InvalidSizing(String),
}

/// Result type for task pool operations.
pub type TaskResult<T> = Result<T, TaskError>;
