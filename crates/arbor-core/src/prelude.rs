//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arbor_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{FrameworkError, FrameworkResult};

// Requests and responses
pub use crate::{Headers, Method, RequestMeta, WireResponse};

// Correlation
pub use crate::TransactionId;
