use std::path::PathBuf;

use pharaoh_game::{FileStorage, MemoryStorage, RecordStorage, StorageError};

/// Leaderboard backend chosen on the command line.
#[derive(Debug, Clone)]
pub enum TesterStorage {
    Memory(MemoryStorage),
    File(FileStorage),
}

impl TesterStorage {
    #[must_use]
    pub fn from_dir(dir: Option<PathBuf>) -> Self {
        dir.map_or_else(
            || Self::Memory(MemoryStorage::new()),
            |dir| Self::File(FileStorage::new(dir)),
        )
    }

    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Memory(_) => "in-memory".to_string(),
            Self::File(storage) => storage.dir().display().to_string(),
        }
    }
}

impl RecordStorage for TesterStorage {
    type Error = StorageError;

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        match self {
            Self::Memory(storage) => Ok(storage.read(key).unwrap_or_default()),
            Self::File(storage) => storage.read(key),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        match self {
            Self::Memory(storage) => {
                let _ = storage.write(key, value);
                Ok(())
            }
            Self::File(storage) => storage.write(key, value),
        }
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        match self {
            Self::Memory(storage) => {
                let _ = storage.remove(key);
                Ok(())
            }
            Self::File(storage) => storage.remove(key),
        }
    }
}
