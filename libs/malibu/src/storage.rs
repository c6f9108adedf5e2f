//! `ETag` persistence.
//!
//! [`ETagStore`] maps request fingerprints to the last `ETag` seen for them.
//! The backing [`KeyValueStore`] decides durability: [`MemoryStorage`] lives
//! as long as the engine, [`FileStorage`] keeps a JSON document on disk.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// String key/value persistence used behind the `ETag` store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    /// Returns the I/O error of a persistent backend.
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// Single JSON document (`etags.json`) inside a storage directory.
///
/// The whole map is loaded on open and rewritten on every `set`.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Name of the storage file inside the directory.
    pub const FILE_NAME: &'static str = "etags.json";

    /// Open (creating if needed) the store under `dir`.
    ///
    /// An existing file that is not a JSON string map is treated as empty
    /// and replaced on the next write.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or the file
    /// exists but cannot be read.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(Self::FILE_NAME);

        let entries = match fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable ETag storage");
                HashMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the storage file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// The in-memory map only changes once the file has been written.
    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        next.insert(key.to_owned(), value.to_owned());
        fs::write(&self.path, serde_json::to_vec(&next)?)?;
        *entries = next;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ETag store
// ---------------------------------------------------------------------------

/// Fingerprint to `ETag` mapping. Last write wins; entries never expire.
#[derive(Clone)]
pub struct ETagStore {
    storage: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for ETagStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ETagStore").finish_non_exhaustive()
    }
}

impl Default for ETagStore {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }
}

impl ETagStore {
    /// Store backed by `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// `ETag` stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.storage.get(key)
    }

    /// Store `value` under `key`. Persistence failures are logged and
    /// otherwise ignored.
    pub fn add(&self, value: &str, key: &str) {
        if let Err(e) = self.storage.set(key, value) {
            tracing::warn!(key = %key, error = %e, "Failed to persist ETag");
        }
    }
}
