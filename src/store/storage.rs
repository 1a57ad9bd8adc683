//! Durable key/value storage backends
//!
//! The local store mirrors its bundle into a `DurableStorage` after every
//! mutation. Backends report quota exhaustion distinctly so the store can
//! prune and retry once.

use parking_lot::Mutex as ParkingMutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by a storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage quota exceeded: {requested} bytes requested, limit is {limit} bytes")]
    QuotaExceeded { requested: usize, limit: usize },

    #[error("Storage device full: {0}")]
    StorageFull(std::io::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Out of space, whether by a configured quota or a full device.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(
            self,
            StorageError::QuotaExceeded { .. } | StorageError::StorageFull(_)
        )
    }
}

/// Classify a failed write, separating out-of-space from other IO errors.
pub fn classify_write_error(err: std::io::Error) -> StorageError {
    match err.kind() {
        std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded => {
            StorageError::StorageFull(err)
        }
        _ => StorageError::IoError(err),
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// String key/value storage that survives a page reload.
pub trait DurableStorage: Send + Sync {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

/// In-process storage, optionally bounded by a total byte quota.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: ParkingMutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once all values together would exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: ParkingMutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Bytes currently held, values only.
    pub fn used_bytes(&self) -> usize {
        self.items.lock().values().map(String::len).sum()
    }
}

impl DurableStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut items = self.items.lock();

        if let Some(limit) = self.quota_bytes {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let requested = others + value.len();
            if requested > limit {
                return Err(StorageError::QuotaExceeded { requested, limit });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.items.lock().remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
///
/// Keys are percent-encoded into file names, so any key is safe to use.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    quota_bytes: Option<usize>,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            quota_bytes: None,
        })
    }

    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

impl DurableStorage for FileStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        if let Some(limit) = self.quota_bytes {
            if value.len() > limit {
                return Err(StorageError::QuotaExceeded {
                    requested: value.len(),
                    limit,
                });
            }
        }

        // Write-then-rename so a crash mid-write never leaves a torn snapshot
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        if let Err(e) = std::fs::write(&tmp, value) {
            let _ = std::fs::remove_file(&tmp);
            return Err(classify_write_error(e));
        }
        std::fs::rename(&tmp, &path).map_err(classify_write_error)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
