//! The process-wide cache store.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::error::CacheResult;
use crate::manager::CacheManager;

/// Access scope of a cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Shared, host-owned data.
    System,
    /// Data scoped to the current user.
    User,
}

impl Scope {
    /// The directory-name suffix for this scope.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Lazily populated table of namespace managers.
///
/// One manager exists per `<namespace>.<scope>` for the process
/// lifetime; repeated lookups return the same instance.
pub struct CacheStore {
    root: PathBuf,
    managers: DashMap<String, Arc<CacheManager>>,
}

impl CacheStore {
    /// Create a store rooted at the given caches directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            managers: DashMap::new(),
        }
    }

    /// Trim every namespace opened so far to the given bounds.
    ///
    /// # Errors
    ///
    /// Returns the first eviction or persistence failure.
    pub fn trim_all(&self, max_bytes: u64, max_items: usize) -> CacheResult<()> {
        for entry in &self.managers {
            entry.value().trim(max_bytes, max_items)?;
        }
        Ok(())
    }

    /// The manager for a namespace, created on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace directory cannot be created or
    /// its index cannot be reset after corruption.
    pub fn manager(&self, namespace: &str, scope: Scope) -> CacheResult<Arc<CacheManager>> {
        let key = format!("{namespace}.{}", scope.suffix());
        match self.managers.entry(key.clone()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                debug!(namespace = %key, "creating cache manager");
                let manager = CacheManager::open(self.root.join(&key))?;
                entry.insert(Arc::clone(&manager));
                Ok(manager)
            }
        }
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("root", &self.root)
            .field("namespaces", &self.managers.len())
            .finish_non_exhaustive()
    }
}
