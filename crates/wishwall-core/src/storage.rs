//! Storage port for the serialized wish collection.
//!
//! A slot holds exactly one value: the whole collection. Writers replace it
//! in one step; there is no incremental append at this layer.

use crate::error::ErrorCode;
use crate::lock::{LockError, LockMode, SlotLock};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Default file name of the slot inside the wall directory.
pub const DEFAULT_SLOT_NAME: &str = "wishes.json";

const QUARANTINE_MARK: &str = ".corrupt-";

/// Default bound on advisory lock waits.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Errors from reading or replacing a slot.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error on the slot or its temp file.
    #[error("slot I/O error: {0}")]
    Io(#[from] io::Error),

    /// Lock acquisition failed.
    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    /// The backing store refused the write.
    #[error("slot unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Machine-readable code associated with this storage error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Lock(err) => err.code(),
            Self::Io(_) | Self::Unavailable(_) => ErrorCode::PersistenceFailed,
        }
    }
}

/// Durable home of the serialized collection.
pub trait WishStorage {
    /// Read the slot. `Ok(None)` means nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be read.
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the slot contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the new contents could not be made durable; the
    /// previous contents are left in place.
    fn save(&mut self, bytes: &[u8]) -> Result<(), StorageError>;

    /// Keep a copy of contents that failed to parse. Returns where the copy
    /// went, or `None` if this storage does not keep one.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy could not be written.
    fn quarantine(&mut self, _bytes: &[u8]) -> Result<Option<PathBuf>, StorageError> {
        Ok(None)
    }
}

/// Slot backed by a single file, guarded by an advisory lock file.
///
/// ```text
/// .wishwall/
///   wishes.json        (slot)
///   wishes.json.lock   (advisory lock)
///   wishes.json.tmp    (in-flight write, renamed over the slot)
///   wishes.json.corrupt-20261016T101500.123Z   (one per distinct unparseable slot)
/// ```
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
    lock_timeout: Duration,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        SlotLock::path_for(&self.path)
    }

    fn tmp_path(&self) -> PathBuf {
        sibling(&self.path, "tmp")
    }

    fn quarantine_prefix(&self) -> String {
        let mut prefix = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        prefix.push_str(QUARANTINE_MARK);
        prefix
    }

    /// Quarantined copies of this slot, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot's directory cannot be listed.
    pub fn quarantined(&self) -> Result<Vec<PathBuf>, StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let prefix = self.quarantine_prefix();
        let mut copies = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                copies.push(entry.path());
            }
        }
        // Stamps sort lexically in time order.
        copies.sort();
        Ok(copies)
    }

    fn write_new_copy(&self, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
        let base = sibling(&self.path, &format!("corrupt-{stamp}"));
        let mut candidate = base.clone();
        for n in 1_u32.. {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
            {
                Ok(mut file) => {
                    file.write_all(bytes)?;
                    file.sync_all()?;
                    return Ok(candidate);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let mut name = base.as_os_str().to_owned();
                    name.push(format!("-{n}"));
                    candidate = PathBuf::from(name);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StorageError::Unavailable(format!(
            "no free quarantine name beside {}",
            self.path.display()
        )))
    }
}

impl WishStorage for FileSlot {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let _lock = SlotLock::acquire(&self.path, LockMode::Shared, self.lock_timeout)?;
        match fs::read(&self.path) {
            Ok(bytes) => {
                tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "slot loaded");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let _lock = SlotLock::acquire(&self.path, LockMode::Exclusive, self.lock_timeout)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, bytes)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "slot replaced");
        Ok(())
    }

    /// Each distinct payload gets its own timestamped copy; earlier copies
    /// are never overwritten. A payload already quarantined is not copied
    /// again.
    fn quarantine(&mut self, bytes: &[u8]) -> Result<Option<PathBuf>, StorageError> {
        for existing in self.quarantined()? {
            if fs::read(&existing).is_ok_and(|kept| kept == bytes) {
                tracing::debug!(path = %existing.display(), "corrupt slot already quarantined");
                return Ok(Some(existing));
            }
        }
        self.write_new_copy(bytes).map(Some)
    }
}

pub(crate) fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// In-memory slot. Clones share the same contents, so a "restarted" store
/// can be pointed at the slot a previous one wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    bytes: Option<Vec<u8>>,
    quarantined: Vec<Vec<u8>>,
    fail_saves: bool,
    fail_loads: bool,
}

impl MemorySlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-filled with raw contents.
    #[must_use]
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let slot = Self::new();
        slot.state().bytes = Some(bytes.into());
        slot
    }

    /// Current raw contents.
    #[must_use]
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.state().bytes.clone()
    }

    /// Contents handed to [`WishStorage::quarantine`], oldest first.
    #[must_use]
    pub fn quarantined(&self) -> Vec<Vec<u8>> {
        self.state().quarantined.clone()
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.state().fail_saves = fail;
    }

    /// Make subsequent loads fail (or succeed again).
    pub fn set_fail_loads(&self, fail: bool) {
        self.state().fail_loads = fail;
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WishStorage for MemorySlot {
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let state = self.state();
        if state.fail_loads {
            return Err(StorageError::Unavailable("memory slot is unreadable".into()));
        }
        Ok(state.bytes.clone())
    }

    fn save(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let mut state = self.state();
        if state.fail_saves {
            return Err(StorageError::Unavailable("memory slot is read-only".into()));
        }
        state.bytes = Some(bytes.to_vec());
        drop(state);
        Ok(())
    }

    fn quarantine(&mut self, bytes: &[u8]) -> Result<Option<PathBuf>, StorageError> {
        self.state().quarantined.push(bytes.to_vec());
        Ok(None)
    }
}
