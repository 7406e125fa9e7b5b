//! Per-request transaction identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::headers::{self, Headers};

/// Identifier correlating all log lines and side effects of one request.
///
/// Taken from the inbound transaction header when the transport supplies
/// one; generated otherwise so every request is traceable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    /// Wrap an externally supplied transaction identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Resolve the transaction ID for a request: the transport-supplied
    /// header value when present, a generated one otherwise.
    #[must_use]
    pub fn from_headers(headers: &Headers) -> Self {
        match headers.get(headers::TRANSACTION_ID) {
            Some(id) if !id.is_empty() => Self::new(id),
            _ => Self::generate(),
        }
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
