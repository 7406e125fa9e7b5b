//! The framework-wide error taxonomy.
//!
//! Component crates define their own error enums and convert into
//! [`FrameworkError`] at the dispatch boundary, where the variant decides
//! the wire status of the response.

use thiserror::Error;

/// Errors that can surface from request handling.
#[derive(Debug, Error)]
pub enum FrameworkError {
    /// No handler, route, or item matched the request.
    #[error("not found")]
    NotFound,

    /// An uncaught failure inside a handler body.
    #[error("handler error: {message}")]
    HandlerError {
        /// Description of the failure.
        message: String,
    },

    /// The request was not authorized.
    #[error("unauthorized")]
    Unauthorized,

    /// An outbound call exceeded its deadline.
    #[error("outbound call timed out after {seconds}s")]
    Timeout {
        /// The deadline that expired, in seconds.
        seconds: u64,
    },

    /// A disallowed import or other policy breach at the load boundary.
    #[error("policy violation: {detail}")]
    PolicyViolation {
        /// What the policy rejected.
        detail: String,
    },

    /// A capability was resolved outside a request context, or by an
    /// unknown name.
    #[error("capability '{name}' requires an active request context")]
    RequiresContext {
        /// The capability name that failed to resolve.
        name: String,
    },

    /// On-disk cache state was corrupt. Always recovered locally; carried
    /// here only as a logged diagnostic.
    #[error("cache corruption: {detail}")]
    CacheCorruption {
        /// What was corrupt and how it was recovered.
        detail: String,
    },

    /// A synchronization primitive was misused (e.g. released without a
    /// matching acquire). Always recovered locally.
    #[error("primitive misuse: {detail}")]
    PrimitiveMisuse {
        /// What the caller did wrong.
        detail: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameworkError {
    /// The wire status this error maps to at the dispatch boundary.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Unauthorized => 401,
            Self::Timeout { .. } => 504,
            Self::HandlerError { .. }
            | Self::PolicyViolation { .. }
            | Self::RequiresContext { .. }
            | Self::CacheCorruption { .. }
            | Self::PrimitiveMisuse { .. }
            | Self::Io(_) => 500,
        }
    }

    /// Short machine-readable kind, used in structured error bodies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::HandlerError { .. } => "HandlerError",
            Self::Unauthorized => "Unauthorized",
            Self::Timeout { .. } => "Timeout",
            Self::PolicyViolation { .. } => "PolicyViolation",
            Self::RequiresContext { .. } => "RequiresContext",
            Self::CacheCorruption { .. } => "CacheCorruption",
            Self::PrimitiveMisuse { .. } => "PrimitiveMisuse",
            Self::Io(_) => "Io",
        }
    }

    /// Build a handler error from any displayable failure.
    #[must_use]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::HandlerError {
            message: message.into(),
        }
    }
}

/// Result type for framework operations.
pub type FrameworkResult<T> = Result<T, FrameworkError>;
