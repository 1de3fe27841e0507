//! Identity gating over an external wallet/session provider.
//!
//! The provider is consulted on every query; connection changes made through
//! [`IdentityProvider::connect`] / [`IdentityProvider::disconnect`] (or by
//! another process, for file-backed sessions) are picked up on the next call.

use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Label attached to wishes when identities are not enforced.
pub const DEFAULT_ANONYMOUS_LABEL: &str = "Anonymous User";

/// Number of identity characters kept in the display form.
pub const DEFAULT_DISPLAY_PREFIX_LEN: usize = 10;

const ELLIPSIS: &str = "...";

/// Errors raised by identity providers when changing connection state.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Identity strings must contain a non-space character.
    #[error("identity must not be empty")]
    EmptyIdentity,

    /// Session state could not be read or written.
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session state could not be encoded.
    #[error("session encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ProviderError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::EmptyIdentity => ErrorCode::IdentityRequired,
            Self::Io(_) | Self::Encode(_) => ErrorCode::PersistenceFailed,
        }
    }
}

/// Contract consumed from the wallet/session provider.
pub trait IdentityProvider {
    /// Whether a wallet/session is currently connected.
    fn is_connected(&self) -> bool;

    /// Opaque identity string (e.g. a public key) of the connected wallet.
    fn identity(&self) -> Option<String>;

    /// Connect the given identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity is blank or the session cannot be
    /// recorded.
    fn connect(&mut self, identity: &str) -> Result<(), ProviderError>;

    /// Drop the current connection, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be cleared.
    fn disconnect(&mut self) -> Result<(), ProviderError>;
}

/// Whether submissions require a connected identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityPolicy {
    /// Submissions require a connected identity and are attributed to it.
    #[default]
    Gated,
    /// Anyone may submit; every wish carries the anonymous label.
    Open,
}

impl IdentityPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gated => "gated",
            Self::Open => "open",
        }
    }

    #[must_use]
    pub const fn requires_identity(self) -> bool {
        matches!(self, Self::Gated)
    }
}

impl fmt::Display for IdentityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized policy names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown identity policy '{0}' (expected 'gated' or 'open')")]
pub struct ParsePolicyError(pub String);

impl FromStr for IdentityPolicy {
    type Err = ParsePolicyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gated" => Ok(Self::Gated),
            "open" => Ok(Self::Open),
            _ => Err(ParsePolicyError(raw.to_string())),
        }
    }
}

/// Deployment settings for the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSettings {
    pub policy: IdentityPolicy,
    pub display_prefix_len: usize,
    pub anonymous_label: String,
}

impl GateSettings {
    #[must_use]
    pub fn new(policy: IdentityPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            policy: IdentityPolicy::default(),
            display_prefix_len: DEFAULT_DISPLAY_PREFIX_LEN,
            anonymous_label: DEFAULT_ANONYMOUS_LABEL.to_string(),
        }
    }
}

/// Normalizes a provider into connection status plus a display identity.
#[derive(Debug)]
pub struct IdentityGate<P> {
    provider: P,
    settings: GateSettings,
}

impl<P: IdentityProvider> IdentityGate<P> {
    pub const fn new(provider: P, settings: GateSettings) -> Self {
        Self { provider, settings }
    }

    #[must_use]
    pub const fn policy(&self) -> IdentityPolicy {
        self.settings.policy
    }

    #[must_use]
    pub const fn settings(&self) -> &GateSettings {
        &self.settings
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.provider.is_connected()
    }

    /// Raw identity of the connected wallet; `None` when not connected.
    #[must_use]
    pub fn current_identity(&self) -> Option<String> {
        if !self.provider.is_connected() {
            return None;
        }
        self.provider
            .identity()
            .filter(|identity| !identity.trim().is_empty())
    }

    /// Human-readable identity used for attribution.
    ///
    /// Open policy always yields the anonymous label, as does a gated wall
    /// with nothing connected.
    #[must_use]
    pub fn display_identity(&self) -> String {
        match self.settings.policy {
            IdentityPolicy::Open => self.settings.anonymous_label.clone(),
            IdentityPolicy::Gated => self.current_identity().map_or_else(
                || self.settings.anonymous_label.clone(),
                |identity| truncate_identity(&identity, self.settings.display_prefix_len),
            ),
        }
    }

    /// Author string for a new wish, or `None` when the policy requires an
    /// identity and none is connected.
    #[must_use]
    pub fn author(&self) -> Option<String> {
        match self.settings.policy {
            IdentityPolicy::Open => Some(self.settings.anonymous_label.clone()),
            IdentityPolicy::Gated => self
                .current_identity()
                .map(|identity| truncate_identity(&identity, self.settings.display_prefix_len)),
        }
    }

    pub const fn provider(&self) -> &P {
        &self.provider
    }

    pub const fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }
}

/// Fixed-width display form: the first `prefix_len` characters followed by
/// `...`, whatever the identity's length.
#[must_use]
pub fn truncate_identity(identity: &str, prefix_len: usize) -> String {
    let mut shown: String = identity.trim().chars().take(prefix_len).collect();
    shown.push_str(ELLIPSIS);
    shown
}

/// In-memory provider for tests and embedding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticProvider {
    identity: Option<String>,
}

impl StaticProvider {
    #[must_use]
    pub const fn disconnected() -> Self {
        Self { identity: None }
    }

    #[must_use]
    pub fn connected(identity: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
        }
    }
}

impl IdentityProvider for StaticProvider {
    fn is_connected(&self) -> bool {
        self.identity.is_some()
    }

    fn identity(&self) -> Option<String> {
        self.identity.clone()
    }

    fn connect(&mut self, identity: &str) -> Result<(), ProviderError> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(ProviderError::EmptyIdentity);
        }
        self.identity = Some(identity.to_string());
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ProviderError> {
        self.identity = None;
        Ok(())
    }
}

impl<P: IdentityProvider + ?Sized> IdentityProvider for Box<P> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn identity(&self) -> Option<String> {
        (**self).identity()
    }

    fn connect(&mut self, identity: &str) -> Result<(), ProviderError> {
        (**self).connect(identity)
    }

    fn disconnect(&mut self) -> Result<(), ProviderError> {
        (**self).disconnect()
    }
}
