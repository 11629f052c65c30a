//! Shortcut persistence backends.
//! Each backend holds exactly one serialized collection under one key; writes overwrite it whole.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key under which the serialized shortcut collection is stored.
pub const SHORTCUTS_KEY: &str = "aura-dashboard-apps";

const SLED_DEFAULT_PATH: &str = "./data/aura_shortcuts";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A place to keep the serialized shortcut collection.
///
/// `read` returns `Ok(None)` when nothing has been persisted yet.
pub trait ShortcutStorage: Send + Sync {
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError>;
    fn write(&self, bytes: &[u8]) -> Result<(), StorageError>;
}

/// Sled-backed storage: the whole collection lives under [`SHORTCUTS_KEY`].
pub struct SledStorage {
    db: sled::Db,
}

impl SledStorage {
    /// Open (or create) the sled database at `path`, or the default data directory.
    pub fn open(path: Option<impl AsRef<Path>>) -> Result<Self, StorageError> {
        let p = path
            .map(|x| x.as_ref().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(SLED_DEFAULT_PATH));
        let db = sled::open(&p)?;
        tracing::debug!(path = %p.display(), "opened sled shortcut storage");
        Ok(Self { db })
    }
}

impl ShortcutStorage for SledStorage {
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.db.get(SHORTCUTS_KEY.as_bytes())?.map(|v| v.to_vec()))
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StorageError> {
        self.db.insert(SHORTCUTS_KEY.as_bytes(), bytes)?;
        self.db.flush()?;
        Ok(())
    }
}

/// Single JSON file, replaced atomically on every write.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ShortcutStorage for FileStorage {
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write to a sibling temp file then rename so readers never see a partial collection.
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

/// In-process storage. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStorage {
    cell: Mutex<Option<Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cell with raw bytes, as if a previous run had persisted them.
    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            cell: Mutex::new(Some(bytes.into())),
        }
    }
}

impl ShortcutStorage for MemoryStorage {
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let guard = self.cell.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(guard.clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StorageError> {
        let mut guard = self.cell.lock().map_err(|_| StorageError::Poisoned)?;
        *guard = Some(bytes.to_vec());
        Ok(())
    }
}
