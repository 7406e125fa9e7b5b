//! Arbor Cache - Namespaced, disk-backed cache management.
//!
//! This crate provides:
//! - [`CacheStore`], the process-wide table of lazily created namespace
//!   managers (one per `<namespace>.<scope>` directory)
//! - [`CacheManager`], a key→item store with an access-order index and
//!   size/count-bounded eviction
//! - [`CachedItem`], one cache entry: a typed attribute map plus zero or
//!   more named binary sub-blobs, each persisted to its own file
//!
//! Both HTTP response caching and general plugin data caching sit on the
//! same store; they differ only in namespace.
//!
//! Every persisted file (blob, attributes, index) is written to a
//! temporary sibling and atomically renamed into place, never written in
//! place, so readers observe either the old or the new content.
//!
//! # Example
//!
//! ```no_run
//! use arbor_cache::{CacheStore, Scope};
//!
//! # fn main() -> arbor_cache::CacheResult<()> {
//! let store = CacheStore::new("Caches");
//! let manager = store.manager("http-responses", Scope::User)?;
//!
//! let item = manager.item("https://example.com/feed")?;
//! item.set_blob("body", b"<rss/>".to_vec())?;
//! item.set_expiry_interval(300)?;
//!
//! manager.trim(52_428_800, 1024)?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod fs;
mod item;
mod manager;
mod store;

pub use error::{CacheError, CacheResult};
pub use item::CachedItem;
pub use manager::CacheManager;
pub use store::{CacheStore, Scope};
