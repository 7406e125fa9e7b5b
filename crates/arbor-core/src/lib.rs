//! Arbor Core - Foundation types for the Arbor extension host runtime.
//!
//! This crate provides:
//! - The request/response types exchanged with the transport collaborator
//! - Case-insensitive header maps and the framework header names
//! - Per-request transaction identifiers
//! - The process-wide error taxonomy and its wire-status mapping

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod error;
pub mod headers;
pub mod request;
pub mod txn;

pub use error::{FrameworkError, FrameworkResult};
pub use headers::Headers;
pub use request::{Method, RequestMeta, WireResponse};
pub use txn::TransactionId;
