//! Inbound request metadata and the wire response shape.
//!
//! The listening transport lives outside this workspace; it delivers
//! `(path, method, headers)` and receives `(status, headers, body)` back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::headers::Headers;

/// HTTP-style request methods understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Retrieve a resource.
    Get,
    /// Replace or update a resource.
    Put,
    /// Submit data to a handler.
    Post,
    /// Remove a resource.
    Delete,
}

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Put => write!(f, "PUT"),
            Self::Post => write!(f, "POST"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Error returned when parsing an unrecognized method string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown request method: {0}")]
pub struct UnknownMethod(pub String);

/// What the transport delivers for one inbound request.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Request path, possibly carrying a query string.
    pub path: String,
    /// Request method.
    pub method: Method,
    /// Request headers.
    pub headers: Headers,
}

impl RequestMeta {
    /// Create request metadata for a `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::Get,
            headers: Headers::new(),
        }
    }

    /// Attach a header, builder style.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }
}

/// What the transport receives back for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    /// Response status code.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Opaque response body.
    pub body: Vec<u8>,
}

impl WireResponse {
    /// An empty response with the given status.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }
}
