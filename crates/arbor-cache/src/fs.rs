//! Atomic file persistence helpers.

use std::io::Write;
use std::path::Path;

use crate::error::CacheResult;

/// Write `bytes` to a temporary sibling of `path`, then atomically rename
/// it into place. Readers observe either the old content or the new,
/// never a partial write.
pub(crate) fn save_atomic(path: &Path, bytes: &[u8]) -> CacheResult<()> {
    let dir = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent")
    })?;
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read a file in full, mapping a missing file to `None`.
pub(crate) fn load_optional(path: &Path) -> CacheResult<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Remove a file, ignoring a missing one.
pub(crate) fn remove_if_present(path: &Path) -> CacheResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
