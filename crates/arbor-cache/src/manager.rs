//! Per-namespace cache managers.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CacheResult;
use crate::fs::{load_optional, save_atomic};
use crate::item::{AttributesFile, CachedItem, attributes_path, hash_name, shard_dir};

/// File name of the per-namespace index.
const INFO_FILE: &str = "CacheInfo";

/// One index entry: `[last_access_epoch, total_size]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct IndexEntry(pub(crate) i64, pub(crate) u64);

struct ManagerState {
    /// item-name → (last access, total byte size of its sub-blobs).
    info: BTreeMap<String, IndexEntry>,
    /// Weak handles deduplicating concurrent lookups of one name.
    handles: HashMap<String, Weak<CachedItem>>,
}

fn relock<'a, T>(result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

/// A namespaced key→item store with access-order eviction.
///
/// Created lazily by [`crate::CacheStore`] on first access to a
/// namespace; lives for the process lifetime.
pub struct CacheManager {
    path: PathBuf,
    state: Mutex<ManagerState>,
    /// Handed to items so their updates can reach the index without a
    /// strong cycle.
    self_weak: Weak<CacheManager>,
}

impl CacheManager {
    /// Open (or create) the namespace rooted at `path`.
    ///
    /// A corrupt or missing index over a non-empty directory triggers a
    /// full namespace reset; an empty directory starts with an empty
    /// index.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace directory cannot be created or
    /// reset.
    pub(crate) fn open(path: PathBuf) -> CacheResult<Arc<Self>> {
        std::fs::create_dir_all(&path)?;

        let info_path = path.join(INFO_FILE);
        let info = match load_optional(&info_path)? {
            Some(bytes) => match serde_json::from_slice::<BTreeMap<String, IndexEntry>>(&bytes) {
                Ok(info) => info,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt cache index, resetting namespace");
                    reset_namespace(&path)?;
                    BTreeMap::new()
                }
            },
            None if dir_has_entries(&path)? => {
                warn!(path = %path.display(), "no cache index found, resetting namespace");
                reset_namespace(&path)?;
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        };

        Ok(Arc::new_cyclic(|self_weak| Self {
            path,
            state: Mutex::new(ManagerState {
                info,
                handles: HashMap::new(),
            }),
            self_weak: self_weak.clone(),
        }))
    }

    /// The namespace root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load-or-create the item registered under `name`.
    ///
    /// Concurrent lookups of an equal name share one in-memory object
    /// while any handle is alive. A corrupt attributes file resets that
    /// item's metadata to fresh defaults rather than failing the caller.
    ///
    /// # Errors
    ///
    /// Returns an error only for IO failures reading the attributes file.
    pub fn item(&self, name: &str) -> CacheResult<Arc<CachedItem>> {
        let mut state = relock(self.state.lock());

        if let Some(weak) = state.handles.get(name) {
            if let Some(item) = weak.upgrade() {
                return Ok(item);
            }
        }

        let attrs = self.load_attributes(name)?;
        let item = Arc::new(CachedItem::from_parts(
            name,
            self.path.clone(),
            self.self_weak.clone(),
            attrs,
        ));
        state.handles.insert(name.to_string(), Arc::downgrade(&item));
        Ok(item)
    }

    /// Read an item's persisted metadata, falling back to fresh defaults
    /// on corruption.
    fn load_attributes(&self, name: &str) -> CacheResult<AttributesFile> {
        let hash = hash_name(name);
        match load_optional(&attributes_path(&self.path, &hash))? {
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(attrs) => Ok(attrs),
                Err(e) => {
                    warn!(item = %name, error = %e, "corrupt attributes file, using fresh metadata");
                    Ok(AttributesFile::fresh())
                }
            },
            None => Ok(AttributesFile::fresh()),
        }
    }

    /// Persist an item's metadata and update the namespace index.
    pub(crate) fn notify_updated(
        &self,
        name: &str,
        hash: &str,
        file: &AttributesFile,
    ) -> CacheResult<()> {
        let mut state = relock(self.state.lock());
        save_atomic(
            &attributes_path(&self.path, hash),
            &serde_json::to_vec(file)?,
        )?;

        let total_size = file.item_sizes.values().fold(0u64, |a, s| a.saturating_add(*s));
        state
            .info
            .insert(name.to_string(), IndexEntry(file.accessed_at, total_size));
        self.save_info(&state)
    }

    /// Evict least-recently-accessed items until at most `max_items`
    /// remain and the tracked size is at most `max_bytes`.
    ///
    /// Each eviction removes every sub-blob file, the attributes file,
    /// and the index entry. The index is persisted after each pass, so a
    /// crash mid-trim leaves a consistent, possibly stale, index.
    ///
    /// # Errors
    ///
    /// Returns an error if eviction or index persistence hits an IO
    /// failure.
    pub fn trim(&self, max_bytes: u64, max_items: usize) -> CacheResult<()> {
        let mut state = relock(self.state.lock());

        // Least recently accessed first.
        let mut entries: Vec<(String, IndexEntry)> = state
            .info
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1));

        // Pass 1: enforce the item-count bound.
        if entries.len() > max_items {
            let excess = entries.len().saturating_sub(max_items);
            for (name, _) in entries.drain(..excess) {
                evict(&self.path, &mut state, &name)?;
            }
            self.save_info(&state)?;
        }

        // Pass 2: evict ascending by access order until within budget.
        // Every step removes an entry, so the loop always terminates.
        let mut size: u64 = entries.iter().fold(0, |a, e| a.saturating_add(e.1 .1));
        let mut next = 0usize;
        while size > max_bytes && next < entries.len() {
            let (name, entry) = &entries[next];
            evict(&self.path, &mut state, name)?;
            size = size.saturating_sub(entry.1);
            next = next.saturating_add(1);
        }
        self.save_info(&state)?;

        debug!(
            namespace = %self.path.display(),
            size,
            items = state.info.len(),
            "cache trimmed"
        );
        Ok(())
    }

    /// Remove the namespace tree and recreate it empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be removed or recreated.
    pub fn clear(&self) -> CacheResult<()> {
        let mut state = relock(self.state.lock());
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        std::fs::create_dir_all(&self.path)?;
        state.info.clear();
        state.handles.clear();
        self.save_info(&state)
    }

    /// Number of items tracked by the index.
    #[must_use]
    pub fn item_count(&self) -> usize {
        relock(self.state.lock()).info.len()
    }

    /// Total byte size tracked by the index.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        relock(self.state.lock())
            .info
            .values()
            .fold(0, |a, e| a.saturating_add(e.1))
    }

    fn save_info(&self, state: &ManagerState) -> CacheResult<()> {
        save_atomic(
            &self.path.join(INFO_FILE),
            &serde_json::to_vec(&state.info)?,
        )
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("path", &self.path)
            .field("item_count", &self.item_count())
            .finish_non_exhaustive()
    }
}

/// Whether the directory contains anything at all.
fn dir_has_entries(path: &Path) -> CacheResult<bool> {
    Ok(std::fs::read_dir(path)?.next().is_some())
}

/// Wipe a namespace directory back to empty.
fn reset_namespace(path: &Path) -> CacheResult<()> {
    std::fs::remove_dir_all(path)?;
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Remove every on-disk file of one item plus its index entry and any
/// live handle registration.
fn evict(root: &Path, state: &mut ManagerState, name: &str) -> CacheResult<()> {
    let hash = hash_name(name);
    let rest = &hash[2..];
    let shard = shard_dir(root, &hash);

    match std::fs::read_dir(&shard) {
        Ok(dir_entries) => {
            let blob_prefix = format!("{rest}.");
            let attrs_name = format!("{rest}_attributes");
            for dir_entry in dir_entries {
                let dir_entry = dir_entry?;
                let file_name = dir_entry.file_name();
                let file_name = file_name.to_string_lossy();
                if file_name == attrs_name || file_name.starts_with(&blob_prefix) {
                    crate::fs::remove_if_present(&dir_entry.path())?;
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    state.info.remove(name);
    state.handles.remove(name);
    Ok(())
}
