//! Cache store: digest snapshot of the last successful run.
//!
//! The snapshot is a flat JSON object `{ "<remote key>": "<digest>" }`.
//! Storage is injected as a [`CacheBackend`] so the engine never resolves a
//! directory on its own. [`FileBackend`] writes use an atomic `.tmp` + rename.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cdnsync_core::CacheSnapshot;

use crate::error::SyncError;

/// Byte-level read/write sink for the persisted snapshot.
pub trait CacheBackend: Send + Sync {
    /// Read the stored bytes; `Ok(None)` when nothing has been stored yet.
    fn read(&self) -> std::io::Result<Option<Vec<u8>>>;

    /// Replace the stored bytes.
    fn write(&self, bytes: &[u8]) -> std::io::Result<()>;
}

impl<T: CacheBackend + ?Sized> CacheBackend for Arc<T> {
    fn read(&self) -> std::io::Result<Option<Vec<u8>>> {
        (**self).read()
    }

    fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        (**self).write(bytes)
    }
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheBackend for FileBackend {
    fn read(&self) -> std::io::Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        let Some(dir) = self.path.parent() else {
            return Err(std::io::Error::other("invalid cache path"));
        };
        std::fs::create_dir_all(dir)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)
    }
}

/// In-memory backend for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes.into())),
        }
    }

    /// Current stored bytes, if any.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.bytes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl CacheBackend for MemoryBackend {
    fn read(&self) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self.bytes())
    }

    fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        *self
            .bytes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(bytes.to_vec());
        Ok(())
    }
}

/// Loads and saves [`CacheSnapshot`]s through a backend.
pub struct CacheStore {
    backend: Box<dyn CacheBackend>,
}

impl CacheStore {
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Load the previous snapshot.
    ///
    /// Never fails: a missing, unreadable, or corrupt store is an empty
    /// snapshot.
    pub fn load(&self) -> CacheSnapshot {
        let bytes = match self.backend.read() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return CacheSnapshot::new(),
            Err(err) => {
                tracing::warn!(error = %err, "cache unreadable, starting from empty cache");
                return CacheSnapshot::new();
            }
        };
        match serde_json::from_slice::<CacheSnapshot>(&bytes) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(error = %err, "cache corrupt, starting from empty cache");
                CacheSnapshot::new()
            }
        }
    }

    /// Replace the stored snapshot wholesale.
    pub fn save(&self, snapshot: &CacheSnapshot) -> Result<(), SyncError> {
        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| SyncError::Persistence(std::io::Error::other(e)))?;
        self.backend.write(&json).map_err(SyncError::Persistence)
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").finish_non_exhaustive()
    }
}
