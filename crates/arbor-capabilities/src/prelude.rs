//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arbor_capabilities::prelude::*;` to import all essential types.

// Errors
pub use crate::{CapabilityError, CapabilityResult};

// Kits
pub use crate::{ContextKit, Kit, KitRegistration};

// Policies and manifests
pub use crate::{ModuleDecl, PluginManifest, Policy, PolicyBuilder};

// Load-boundary scanning
pub use crate::{ImportViolation, scan_imports};
