//! Arbor Config - Runtime configuration for the Arbor extension host.
//!
//! This crate provides:
//! - The [`RuntimeConfig`] tunables consumed by the runtime components
//! - Layered loading: embedded defaults, an optional overlay file, then
//!   `ARBOR_*` environment fallbacks

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod loader;
mod types;

pub use error::{ConfigError, ConfigResult};
pub use loader::load;
pub use types::{CacheConfig, RuntimeConfig, TaskPoolConfig};
