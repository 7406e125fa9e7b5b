//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arbor_runtime::prelude::*;` to import all essential types.

// Errors
pub use crate::{RuntimeError, RuntimeResult};

// Runtime
pub use crate::Runtime;

// Contexts
pub use crate::{ContextBuilder, ExecutionContext, SharedEnvironment};

// Dispatch
pub use crate::{Dispatcher, PrefixMetadata, RouteTemplate, Router};

// Handlers
pub use crate::{
    BodySerializer, Container, Handler, HandlerValue, JsonBodySerializer, Params, PrivateHandler,
};

// Outbound calls
pub use crate::call_with_timeout;
