//! Persisted collection store.
//!
//! Each named slot holds one JSON document (usually an ordered list of
//! records). Slots live behind the [`KvBackend`] port: Sled on disk for the
//! deployed target, a `HashMap` in memory for tests.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{LexflowError, Result};

/// Slot names used by the components.
pub mod slots {
    pub const ACTIVE_SESSION: &str = "active-session";
    pub const REGISTERED_DIRECTORY: &str = "registered-directory";
    pub const FORM_DEFINITIONS: &str = "form-definitions";
    pub const MAILBOX: &str = "mailbox";
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),
    #[error("{0}")]
    Unavailable(String),
}

/// Synchronous key-value port under the collection store.
pub trait KvBackend: Send + Sync {
    fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, BackendError>;
    fn put(&self, key: &str, value: Vec<u8>) -> std::result::Result<(), BackendError>;
    fn remove(&self, key: &str) -> std::result::Result<(), BackendError>;
}

/// Durable backend: one Sled tree holding every slot.
#[derive(Clone)]
pub struct SledBackend {
    #[allow(dead_code)] // kept so the Db outlives the tree handle
    db: Db,
    slot_tree: sled::Tree,
}

impl SledBackend {
    /// Open or create the Sled database at the given path.
    pub fn open(path: impl AsRef<Path>) -> std::result::Result<Self, BackendError> {
        Self::from_db(sled::open(path)?)
    }

    /// Throwaway database removed on drop.
    pub fn temporary() -> std::result::Result<Self, BackendError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> std::result::Result<Self, BackendError> {
        let slot_tree = db.open_tree("slots")?;
        Ok(Self { db, slot_tree })
    }
}

impl KvBackend for SledBackend {
    fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, BackendError> {
        Ok(self.slot_tree.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &str, value: Vec<u8>) -> std::result::Result<(), BackendError> {
        // Single-key insert is atomic; flush so a crash after return keeps the write.
        self.slot_tree.insert(key.as_bytes(), value)?;
        self.slot_tree.flush()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> std::result::Result<(), BackendError> {
        self.slot_tree.remove(key.as_bytes())?;
        self.slot_tree.flush()?;
        Ok(())
    }
}

/// In-memory backend for tests. `set_fail_writes(true)` simulates a full
/// or read-only medium, `set_fail_reads(true)` an unreadable one.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    slots: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_writes: Arc<Mutex<bool>>,
    fail_reads: Arc<Mutex<bool>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *lock(&self.fail_writes) = fail;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *lock(&self.fail_reads) = fail;
    }

    /// Write raw bytes, bypassing serialization (used to plant corrupt slots).
    pub fn put_raw(&self, key: &str, value: &[u8]) {
        lock(&self.slots).insert(key.to_string(), value.to_vec());
    }

    fn check_writable(&self) -> std::result::Result<(), BackendError> {
        if *lock(&self.fail_writes) {
            return Err(BackendError::Unavailable("quota exceeded".to_string()));
        }
        Ok(())
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, BackendError> {
        if *lock(&self.fail_reads) {
            return Err(BackendError::Unavailable("access denied".to_string()));
        }
        Ok(lock(&self.slots).get(key).cloned())
    }

    fn put(&self, key: &str, value: Vec<u8>) -> std::result::Result<(), BackendError> {
        self.check_writable()?;
        lock(&self.slots).insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> std::result::Result<(), BackendError> {
        self.check_writable()?;
        lock(&self.slots).remove(key);
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned lock only means another test thread panicked mid-write.
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Load/save of whole named slots. Cheap to clone; clones share the
/// backend and the session overlay.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KvBackend>,
    // Writes that failed to persist. Later loads in this session see them,
    // so in-memory state runs ahead of disk rather than silently reverting.
    overlay: Arc<Mutex<HashMap<String, Option<Vec<u8>>>>>,
}

impl Storage {
    pub fn new(backend: impl KvBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            overlay: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Open the Sled-backed store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let backend = SledBackend::open(path).map_err(|e| LexflowError::StorageUnavailable {
            slot: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(backend))
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Ordered records of `slot`; empty when absent or unparseable.
    pub fn load<T: DeserializeOwned>(&self, slot: &str) -> Vec<T> {
        self.load_value::<Vec<T>>(slot).unwrap_or_default()
    }

    /// Overwrite `slot` with `records`.
    pub fn save<T: Serialize>(&self, slot: &str, records: &[T]) -> Result<()> {
        self.save_value(slot, &records)
    }

    /// Single value stored in `slot`, or `None` when absent, unreadable or
    /// malformed. Read failures never propagate.
    pub fn load_value<T: DeserializeOwned>(&self, slot: &str) -> Option<T> {
        let bytes = match self.read_bytes(slot) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(slot, "slot absent");
                return None;
            }
            Err(e) => {
                warn!(slot, error = %e, "slot unreadable, treating as empty");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(slot, bytes = bytes.len(), "slot loaded");
                Some(value)
            }
            Err(e) => {
                warn!(slot, error = %e, "slot content malformed, treating as empty");
                None
            }
        }
    }

    pub fn save_value<T: Serialize + ?Sized>(&self, slot: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| LexflowError::StorageUnavailable {
            slot: slot.to_string(),
            reason: e.to_string(),
        })?;
        let len = bytes.len();
        self.write(slot, Some(bytes))?;
        debug!(slot, bytes = len, "slot saved");
        Ok(())
    }

    /// Remove `slot` entirely.
    pub fn clear(&self, slot: &str) -> Result<()> {
        self.write(slot, None)?;
        debug!(slot, "slot cleared");
        Ok(())
    }

    fn read_bytes(&self, slot: &str) -> std::result::Result<Option<Vec<u8>>, BackendError> {
        if let Some(pending) = lock(&self.overlay).get(slot) {
            return Ok(pending.clone());
        }
        self.backend.get(slot)
    }

    fn write(&self, slot: &str, bytes: Option<Vec<u8>>) -> Result<()> {
        let outcome = match &bytes {
            Some(b) => self.backend.put(slot, b.clone()),
            None => self.backend.remove(slot),
        };
        let mut overlay = lock(&self.overlay);
        match outcome {
            Ok(()) => {
                overlay.remove(slot);
                Ok(())
            }
            Err(e) => {
                warn!(slot, error = %e, "write failed, keeping attempted state for this session");
                overlay.insert(slot.to_string(), bytes);
                Err(LexflowError::StorageUnavailable {
                    slot: slot.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
