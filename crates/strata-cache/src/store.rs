use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use strata_core::CacheKey;
use tracing::debug;

use crate::error::CacheError;

/// A byte store addressed by cache key.
///
/// Implementations may be shared between processes; writes are best-effort
/// and a concurrent writer of the same key is acceptable.
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    fn read(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;
    fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError>;
    /// Removing a missing entry is not an error.
    fn remove(&self, key: &CacheKey) -> Result<(), CacheError>;
}

static NEXT_TEMP: AtomicU64 = AtomicU64::new(0);

/// One `<hex-key>.anim` file per entry under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.anim", key.to_hex()))
    }
}

impl CacheStore for FileStore {
    fn read(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.entry_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Io(path, e)),
        }
    }

    fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.root).map_err(|e| CacheError::Io(self.root.clone(), e))?;

        // Write beside the target and rename so readers never see a partial entry.
        let temp = self.root.join(format!(
            ".{}.{}-{}.tmp",
            key.to_hex(),
            std::process::id(),
            NEXT_TEMP.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp, bytes).map_err(|e| CacheError::Io(temp.clone(), e))?;

        let path = self.entry_path(key);
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(CacheError::Io(path, e));
        }
        debug!("wrote {} byte cache entry to {}", bytes.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io(path, e)),
        }
    }
}

/// In-process store, mostly for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CacheKey, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn read(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        self.entries.lock().insert(*key, bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
