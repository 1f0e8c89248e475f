use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no usable storage location")]
    NoLocation,
}

/// Opaque key-value persistence port. Blobs are strings (JSON in practice);
/// callers treat every failure as recoverable and keep serving from memory.
pub trait MemoryStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, key: &str, blob: &str) -> Result<(), StoreError>;
}

/// One JSON file per key under a root directory.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default per-user location under the platform data directory.
    pub fn default_location() -> Result<Self, StoreError> {
        let root = dirs::data_dir()
            .ok_or(StoreError::NoLocation)?
            .join("flightscope");
        Ok(Self::new(root))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl MemoryStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.path_for(key), blob)?;
        Ok(())
    }
}

/// Process-local store for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStore for InMemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), StoreError> {
        self.blobs.lock().unwrap().insert(key.to_string(), blob.to_string());
        Ok(())
    }
}
