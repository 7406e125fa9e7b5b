//! Arbor Runtime - Request execution for the Arbor extension host.
//!
//! This crate provides:
//! - [`ExecutionContext`]: per-request state plus the capability bindings
//!   materialized for that request
//! - [`ContextBuilder`]: cheap context construction driven by the active
//!   policy, and exactly-once release on every exit path
//! - [`Dispatcher`]: management → private → prefix → route resolution,
//!   container paging, and response construction with the framework's
//!   status mapping
//! - [`Runtime`]: the facade the transport collaborator calls with
//!   `(path, method, headers)` to receive `(status, headers, body)`
//!
//! The runtime is thread-based: each dispatched request may run on its
//! own OS thread, and handlers block their worker on task results, named
//! primitives, and outbound calls.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod builder;
mod context;
mod dispatcher;
mod environment;
mod error;
mod handler;
mod outbound;
mod router;
mod runtime;

pub use builder::ContextBuilder;
pub use context::ExecutionContext;
pub use dispatcher::{Dispatcher, PrefixMetadata};
pub use environment::SharedEnvironment;
pub use error::{RuntimeError, RuntimeResult};
pub use handler::{
    BodySerializer, Container, Handler, HandlerValue, JsonBodySerializer, Params, PrivateHandler,
};
pub use outbound::call_with_timeout;
pub use router::{RouteTemplate, Router};
pub use runtime::Runtime;
