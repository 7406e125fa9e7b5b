//! Cached items.
//!
//! One item is an attribute map plus zero or more named binary sub-blobs.
//! Attribute metadata auto-persists on every access or mutation, which is
//! also what keeps the manager's access-order index current for eviction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CacheResult;
use crate::fs::{load_optional, save_atomic};
use crate::manager::CacheManager;

/// Hex digest used to shard item files across directories.
pub(crate) fn hash_name(name: &str) -> String {
    hex::encode(Sha256::digest(name.as_bytes()))
}

/// Directory holding every file of the item with the given hash.
pub(crate) fn shard_dir(root: &Path, hash: &str) -> PathBuf {
    root.join(&hash[..2])
}

/// Path of one named sub-blob.
pub(crate) fn blob_path(root: &Path, hash: &str, sub: &str) -> PathBuf {
    shard_dir(root, hash).join(format!("{}.{sub}", &hash[2..]))
}

/// Path of the item's attribute metadata file.
pub(crate) fn attributes_path(root: &Path, hash: &str) -> PathBuf {
    shard_dir(root, hash).join(format!("{}_attributes", &hash[2..]))
}

/// Current epoch seconds.
pub(crate) fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

/// The persisted attribute metadata of one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AttributesFile {
    pub(crate) accessed_at: i64,
    pub(crate) modified_at: i64,
    pub(crate) expiry_interval: u64,
    pub(crate) attributes: BTreeMap<String, serde_json::Value>,
    pub(crate) item_sizes: BTreeMap<String, u64>,
}

impl AttributesFile {
    pub(crate) fn fresh() -> Self {
        let now = now_epoch();
        Self {
            accessed_at: now,
            modified_at: now,
            expiry_interval: 0,
            attributes: BTreeMap::new(),
            item_sizes: BTreeMap::new(),
        }
    }
}

/// One cache entry.
///
/// Handles are deduplicated by the owning [`CacheManager`]: concurrent
/// lookups of an equal name within a short window share one in-memory
/// object, without the manager pinning it alive.
#[derive(Debug)]
pub struct CachedItem {
    name: String,
    hash: String,
    root: PathBuf,
    manager: Weak<CacheManager>,
    state: Mutex<AttributesFile>,
}

fn relock<'a, T>(result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

impl CachedItem {
    pub(crate) fn from_parts(
        name: &str,
        root: PathBuf,
        manager: Weak<CacheManager>,
        state: AttributesFile,
    ) -> Self {
        Self {
            name: name.to_string(),
            hash: hash_name(name),
            root,
            manager,
            state: Mutex::new(state),
        }
    }

    /// The item's key within its namespace.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read an attribute. A hit refreshes the access time.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the refreshed metadata fails.
    pub fn get_attr(&self, key: &str) -> CacheResult<Option<serde_json::Value>> {
        let mut state = relock(self.state.lock());
        let Some(value) = state.attributes.get(key).cloned() else {
            return Ok(None);
        };
        state.accessed_at = now_epoch();
        // Persist while the state lock is held so snapshots reach the
        // manager in mutation order.
        self.notify(&state)?;
        Ok(Some(value))
    }

    /// Write an attribute and persist the metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn set_attr(&self, key: &str, value: impl Into<serde_json::Value>) -> CacheResult<()> {
        let mut state = relock(self.state.lock());
        let now = now_epoch();
        state.accessed_at = now;
        state.modified_at = now;
        state.attributes.insert(key.to_string(), value.into());
        self.notify(&state)
    }

    /// Read a named sub-blob from disk, refreshing the access time.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob file cannot be read or the refreshed
    /// metadata cannot be persisted.
    pub fn get_blob(&self, sub: &str) -> CacheResult<Option<Vec<u8>>> {
        {
            let mut state = relock(self.state.lock());
            state.accessed_at = now_epoch();
            self.notify(&state)?;
        }
        load_optional(&blob_path(&self.root, &self.hash, sub))
    }

    /// Write a named sub-blob to its own file and persist the metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob or metadata cannot be persisted.
    pub fn set_blob(&self, sub: &str, data: Vec<u8>) -> CacheResult<()> {
        save_atomic(&blob_path(&self.root, &self.hash, sub), &data)?;
        let mut state = relock(self.state.lock());
        let now = now_epoch();
        state.accessed_at = now;
        state.modified_at = now;
        state.item_sizes.insert(sub.to_string(), data.len() as u64);
        self.notify(&state)
    }

    /// Set the expiry interval, in seconds. Zero means always expired.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn set_expiry_interval(&self, seconds: u64) -> CacheResult<()> {
        let mut state = relock(self.state.lock());
        state.expiry_interval = seconds;
        self.notify(&state)
    }

    /// Whether the item's content is past its expiry interval.
    ///
    /// An interval of zero means the item is always considered expired.
    #[must_use]
    pub fn expired(&self) -> bool {
        let state = relock(self.state.lock());
        if state.expiry_interval == 0 {
            return true;
        }
        let age = now_epoch().saturating_sub(state.modified_at);
        age > i64::try_from(state.expiry_interval).unwrap_or(i64::MAX)
    }

    /// Last access time, as epoch seconds.
    #[must_use]
    pub fn accessed_at(&self) -> i64 {
        relock(self.state.lock()).accessed_at
    }

    /// Last modification time, as epoch seconds.
    #[must_use]
    pub fn modified_at(&self) -> i64 {
        relock(self.state.lock()).modified_at
    }

    /// Push the snapshot to the owning manager, which persists the
    /// attributes file and updates the namespace index. An item that
    /// outlived its manager has nowhere to persist to; its state stays
    /// in memory only.
    fn notify(&self, snapshot: &AttributesFile) -> CacheResult<()> {
        match self.manager.upgrade() {
            Some(manager) => manager.notify_updated(&self.name, &self.hash, snapshot),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_hex() {
        let hash = hash_name("some key");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_name("some key"));
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn paths_shard_on_the_first_two_hex_chars() {
        let root = PathBuf::from("/cache/ns.user");
        let hash = hash_name("item");
        let blob = blob_path(&root, &hash, "body");
        assert!(blob.starts_with(root.join(&hash[..2])));
        assert!(blob.to_string_lossy().ends_with(&format!("{}.body", &hash[2..])));

        let attrs = attributes_path(&root, &hash);
        assert!(attrs
            .to_string_lossy()
            .ends_with(&format!("{}_attributes", &hash[2..])));
    }

    #[test]
    fn zero_interval_is_always_expired() {
        let item = CachedItem::from_parts(
            "x",
            PathBuf::from("/tmp/unused"),
            Weak::new(),
            AttributesFile::fresh(),
        );
        assert!(item.expired());
        item.set_expiry_interval(3600).unwrap();
        assert!(!item.expired());
    }
}
