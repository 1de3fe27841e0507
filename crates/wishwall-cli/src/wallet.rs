//! Wallet identity resolution for CLI commands.
//!
//! The resolution chain: `--identity` flag > `WISHWALL_IDENTITY` env > the
//! session written by `wish connect`. Empty values are skipped at every step.
//! Flag and env identities are treated as connected for the duration of the
//! command only; `connect`/`disconnect` always act on the session file.

use std::env;
use wishwall_core::identity::{IdentityProvider, ProviderError};
use wishwall_core::session::SessionFile;

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

/// Real environment reader.
struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Core override logic, parameterized by environment reader.
fn resolve_override_with(cli_flag: Option<&str>, env: &dyn EnvReader) -> Option<String> {
    if let Some(identity) = cli_flag {
        let identity = identity.trim();
        if !identity.is_empty() {
            return Some(identity.to_string());
        }
    }

    env.get("WISHWALL_IDENTITY")
        .map(|identity| identity.trim().to_string())
}

/// Identity provider used by the `wish` binary.
#[derive(Debug, Clone)]
pub struct CliWallet {
    override_identity: Option<String>,
    session: SessionFile,
}

impl CliWallet {
    /// Wallet that honors `--identity` and `WISHWALL_IDENTITY` before the
    /// session file.
    pub fn resolve(cli_flag: Option<&str>, session: SessionFile) -> Self {
        Self::resolve_with(cli_flag, session, &RealEnv)
    }

    fn resolve_with(cli_flag: Option<&str>, session: SessionFile, env: &dyn EnvReader) -> Self {
        Self {
            override_identity: resolve_override_with(cli_flag, env),
            session,
        }
    }

    /// Where the current identity came from.
    pub fn source(&self) -> &'static str {
        if self.override_identity.is_some() {
            "override"
        } else if self.session.is_connected() {
            "session"
        } else {
            "none"
        }
    }
}

impl IdentityProvider for CliWallet {
    fn is_connected(&self) -> bool {
        self.override_identity.is_some() || self.session.is_connected()
    }

    fn identity(&self) -> Option<String> {
        self.override_identity
            .clone()
            .or_else(|| self.session.identity())
    }

    fn connect(&mut self, identity: &str) -> Result<(), ProviderError> {
        self.session.connect(identity)
    }

    fn disconnect(&mut self) -> Result<(), ProviderError> {
        self.session.disconnect()
    }
}
