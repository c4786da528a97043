//! Keyed text storage behind the leaderboard.
//!
//! The core never touches a filesystem directly; the host picks a backend.
use std::collections::HashMap;
use std::convert::Infallible;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Trait for abstracting persistence of string records.
/// Platform-specific implementations should provide this.
pub trait RecordStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read. A missing key is
    /// `Ok(None)`.
    fn read(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Replace the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Delete the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be removed.
    fn remove(&self, key: &str) -> Result<(), Self::Error>;
}

/// In-process storage. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_records<R>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> R) -> R {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut records)
    }
}

impl RecordStorage for MemoryStorage {
    type Error = Infallible;

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.with_records(|records| records.get(key).cloned()))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.with_records(|records| records.insert(key.to_string(), value.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        self.with_records(|records| records.remove(key));
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no local data directory on this platform")]
    NoDataDir,
    #[error("invalid record key '{0}'")]
    InvalidKey(String),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<local data dir>/pharaoh`, e.g. `~/.local/share/pharaoh` on Linux.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform reports no local data directory.
    pub fn in_data_dir() -> Result<Self, StorageError> {
        let base = dirs::data_local_dir().ok_or(StorageError::NoDataDir)?;
        Ok(Self::new(base.join("pharaoh")))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if valid {
            Ok(self.dir.join(format!("{key}.json")))
        } else {
            Err(StorageError::InvalidKey(key.to_string()))
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl RecordStorage for FileStorage {
    type Error = StorageError;

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path)(err)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        fs::write(&path, value).map_err(io_error(&path))
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(io_error(&path)(err)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("pharaoh-{label}-{}-{nanos}", std::process::id()))
    }

    #[test]
    fn memory_clones_share_records() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.write("board", "[]").unwrap();
        assert_eq!(other.read("board").unwrap().as_deref(), Some("[]"));
        other.remove("board").unwrap();
        assert_eq!(storage.read("board").unwrap(), None);
    }

    #[test]
    fn file_storage_roundtrips_and_tolerates_missing() {
        let dir = temp_dir("file");
        let storage = FileStorage::new(&dir);
        assert_eq!(storage.read("pharaoh-leaderboard").unwrap(), None);
        storage.write("pharaoh-leaderboard", "[1]").unwrap();
        assert_eq!(
            storage.read("pharaoh-leaderboard").unwrap().as_deref(),
            Some("[1]")
        );
        assert!(dir.join("pharaoh-leaderboard.json").exists());
        storage.remove("pharaoh-leaderboard").unwrap();
        storage.remove("pharaoh-leaderboard").unwrap();
        assert_eq!(storage.read("pharaoh-leaderboard").unwrap(), None);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn file_storage_rejects_path_like_keys() {
        let storage = FileStorage::new(temp_dir("keys"));
        assert!(matches!(
            storage.read("../escape"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(storage.write("", "x"), Err(StorageError::InvalidKey(_))));
    }
}
