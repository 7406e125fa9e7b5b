//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arbor_telemetry::prelude::*;` to import all essential types.

// Errors
pub use crate::{TelemetryError, TelemetryResult};

// Logging setup
pub use crate::{LogConfig, LogFormat, setup_default_logging, setup_logging};

// Correlation
pub use crate::RequestContext;
