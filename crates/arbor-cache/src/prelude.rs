//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arbor_cache::prelude::*;` to import all essential types.

// Errors
pub use crate::{CacheError, CacheResult};

// Store and managers
pub use crate::{CacheManager, CacheStore, Scope};

// Items
pub use crate::CachedItem;
