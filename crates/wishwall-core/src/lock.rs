//! Advisory locking for a wish slot.
//!
//! A slot `wishes.json` is guarded by a companion `wishes.json.lock`. Loads
//! take the lock shared, saves take it exclusive. Waiting is bounded: a
//! contended lock is retried with a growing pause until the deadline passes.

use crate::error::ErrorCode;
use crate::storage::sibling;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const FIRST_PAUSE: Duration = Duration::from_millis(2);
const MAX_PAUSE: Duration = Duration::from_millis(25);

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another holder kept a conflicting lock past the deadline.
    #[error("{}: slot lock {} still held after {:?}", ErrorCode::LockContention, .path.display(), .waited)]
    Timeout { path: PathBuf, waited: Duration },

    /// The lock file could not be opened or locked.
    #[error("{}: slot lock {}: {source}", ErrorCode::PersistenceFailed, .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LockError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::Io { .. } => ErrorCode::PersistenceFailed,
        }
    }
}

/// How a slot lock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Any number of readers.
    Shared,
    /// One writer, no readers.
    Exclusive,
}

/// A held lock on a slot. Released when dropped.
#[derive(Debug)]
pub struct SlotLock {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl SlotLock {
    /// Lock file guarding `slot`.
    #[must_use]
    pub fn path_for(slot: &Path) -> PathBuf {
        sibling(slot, "lock")
    }

    /// Lock `slot` in `mode`, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Timeout`] when a conflicting holder outlasts
    /// `timeout`, or [`LockError::Io`] when the lock file cannot be opened
    /// (for example, its directory is missing).
    pub fn acquire(slot: &Path, mode: LockMode, timeout: Duration) -> Result<Self, LockError> {
        let path = Self::path_for(slot);
        let file = match OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
        {
            Ok(file) => file,
            Err(source) => return Err(LockError::Io { path, source }),
        };

        let started = Instant::now();
        let mut pause = FIRST_PAUSE;
        loop {
            let attempt = match mode {
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
            };
            match attempt {
                Ok(()) => return Ok(Self { file, path, mode }),
                Err(source) if !is_contended(&source) => {
                    return Err(LockError::Io { path, source });
                }
                Err(_) => {}
            }

            let waited = started.elapsed();
            if waited >= timeout {
                tracing::debug!(path = %path.display(), ?mode, ?waited, "slot lock contended");
                return Err(LockError::Timeout { path, waited });
            }
            thread::sleep(pause.min(timeout - waited));
            pause = (pause * 2).min(MAX_PAUSE);
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn mode(&self) -> LockMode {
        self.mode
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl Drop for SlotLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    const SHORT: Duration = Duration::from_millis(20);
    const LONG: Duration = Duration::from_millis(500);

    fn slot_in(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("wishes.json")
    }

    #[test]
    fn lock_file_sits_next_to_slot() {
        assert_eq!(
            SlotLock::path_for(Path::new("/walls/a/wishes.json")),
            PathBuf::from("/walls/a/wishes.json.lock")
        );
    }

    #[test]
    fn readers_share_the_slot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let slot = slot_in(&dir);
        let first = SlotLock::acquire(&slot, LockMode::Shared, SHORT).expect("first reader");
        let second = SlotLock::acquire(&slot, LockMode::Shared, SHORT).expect("second reader");
        assert_eq!(first.mode(), LockMode::Shared);
        assert_eq!(second.path(), SlotLock::path_for(&slot));
    }

    #[test]
    fn writer_excludes_readers_and_writers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let slot = slot_in(&dir);
        let _writer = SlotLock::acquire(&slot, LockMode::Exclusive, SHORT).expect("writer");

        let started = Instant::now();
        let reader = SlotLock::acquire(&slot, LockMode::Shared, SHORT);
        assert!(matches!(reader, Err(LockError::Timeout { .. })));
        assert!(started.elapsed() >= SHORT);

        let err = SlotLock::acquire(&slot, LockMode::Exclusive, SHORT).unwrap_err();
        assert_eq!(err.code(), ErrorCode::LockContention);
        assert!(err.to_string().starts_with("E5002"));
    }

    #[test]
    fn dropping_the_writer_lets_a_waiter_in() {
        let dir = tempfile::tempdir().expect("tempdir");
        let slot = slot_in(&dir);
        let writer = SlotLock::acquire(&slot, LockMode::Exclusive, SHORT).expect("writer");

        let (tx, rx) = mpsc::channel();
        let waiting_slot = slot.clone();
        let waiter = thread::spawn(move || {
            tx.send(()).expect("signal");
            SlotLock::acquire(&waiting_slot, LockMode::Exclusive, LONG).map(|lock| lock.mode())
        });

        rx.recv().expect("waiter started");
        thread::sleep(Duration::from_millis(30));
        drop(writer);

        let mode = waiter.join().expect("join").expect("waiter acquires after release");
        assert_eq!(mode, LockMode::Exclusive);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let slot = dir.path().join("absent").join("wishes.json");
        let err = SlotLock::acquire(&slot, LockMode::Shared, SHORT).unwrap_err();
        assert!(matches!(err, LockError::Io { .. }));
        assert_eq!(err.code(), ErrorCode::PersistenceFailed);
    }
}
