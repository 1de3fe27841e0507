//! Wallet session persisted as a small JSON file.
//!
//! `connect` writes `session.json` through a temp file and rename;
//! `disconnect` removes it. A missing or unparseable file reads as
//! "not connected".

use crate::identity::{IdentityProvider, ProviderError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the session record inside the wall directory.
pub const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SessionRecord {
    identity: String,
    connected_at: i64,
}

/// File-backed wallet session.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    /// Session stored at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Session stored in `<wall_dir>/session.json`.
    #[must_use]
    pub fn in_dir(wall_dir: &Path) -> Self {
        Self::new(wall_dir.join(SESSION_FILE))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Epoch-millisecond instant of the current connection.
    #[must_use]
    pub fn connected_at(&self) -> Option<i64> {
        self.read().map(|record| record.connected_at)
    }

    fn read(&self) -> Option<SessionRecord> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session file unreadable");
                return None;
            }
        };

        match serde_json::from_slice::<SessionRecord>(&raw) {
            Ok(record) if !record.identity.trim().is_empty() => Some(record),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session file corrupt");
                None
            }
        }
    }
}

impl IdentityProvider for SessionFile {
    fn is_connected(&self) -> bool {
        self.read().is_some()
    }

    fn identity(&self) -> Option<String> {
        self.read().map(|record| record.identity)
    }

    fn connect(&mut self, identity: &str) -> Result<(), ProviderError> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(ProviderError::EmptyIdentity);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let record = SessionRecord {
            identity: identity.to_string(),
            connected_at: chrono::Utc::now().timestamp_millis(),
        };
        let body = serde_json::to_vec_pretty(&record)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "wallet session connected");
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ProviderError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "wallet session cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
