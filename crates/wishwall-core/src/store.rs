//! The wish store: validation, attribution, ordering, and persistence.
//!
//! A store starts Uninitialized and becomes Ready after [`WishStore::initialize`].
//! Submissions append in memory first and then rewrite the whole slot. When
//! that write fails the wish stays appended: the in-memory collection is the
//! source of truth until the next successful write or a restart, and the
//! caller gets [`SubmitError::Persistence`] carrying the wish.
//!
//! A slot that could not be read at all is never overwritten: after
//! [`LoadOutcome::Unreadable`] every write is refused until a later
//! `initialize` reads the slot successfully.

use crate::error::ErrorCode;
use crate::identity::{IdentityGate, IdentityPolicy, IdentityProvider};
use crate::model::{Wish, WishCollection};
use crate::storage::{StorageError, WishStorage};
use std::path::PathBuf;

/// Source of creation instants, in epoch milliseconds.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

impl<F: Fn() -> i64> Clock for F {
    fn now_millis(&self) -> i64 {
        self()
    }
}

/// Lifecycle of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Ready,
}

/// What [`WishStore::initialize`] found in the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing stored yet.
    Absent,
    /// A valid collection was loaded.
    Loaded { count: usize },
    /// The slot did not parse; an empty collection was substituted.
    Recovered { quarantined: Option<PathBuf> },
    /// The slot could not be read; an empty collection was substituted and
    /// writes are refused.
    Unreadable,
}

impl LoadOutcome {
    /// Code worth surfacing to the user for this outcome, if any.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Absent | Self::Loaded { .. } => None,
            Self::Recovered { .. } => Some(ErrorCode::CorruptPersistedData),
            Self::Unreadable => Some(ErrorCode::UnreadablePersistedData),
        }
    }
}

/// Errors returned by [`WishStore::submit`] and [`WishStore::list`].
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// `initialize` has not completed.
    #[error("wish store not initialized")]
    NotInitialized,

    /// Gated wall and no wallet connected.
    #[error("a connected wallet identity is required to submit a wish")]
    IdentityRequired,

    /// Wish text was blank after trimming.
    #[error("wish text is empty")]
    EmptyWish,

    /// The last load could not read the slot, so writing would replace
    /// wishes this store never saw.
    #[error("stored wishes could not be read; refusing to overwrite them")]
    SlotUnreadable,

    /// Ids are exhausted: the newest id is already `i64::MAX`.
    #[error("no wish id left after {max}")]
    IdExhausted { max: i64 },

    /// A flush failed with nothing to attribute it to.
    #[error("failed to save wishes: {0}")]
    Storage(#[source] StorageError),

    /// The wish was accepted and appended in memory, but the slot write
    /// failed.
    #[error("wish {} kept in memory but not saved: {source}", .wish.id)]
    Persistence {
        wish: Wish,
        #[source]
        source: StorageError,
    },
}

impl SubmitError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::IdentityRequired => ErrorCode::IdentityRequired,
            Self::EmptyWish => ErrorCode::EmptyWish,
            Self::SlotUnreadable => ErrorCode::UnreadablePersistedData,
            Self::IdExhausted { .. } => ErrorCode::InternalUnexpected,
            Self::Persistence { .. } | Self::Storage(_) => ErrorCode::PersistenceFailed,
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// True for rejections that left the store untouched.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::IdentityRequired | Self::EmptyWish)
    }

    /// The wish that was appended despite the error, if any.
    #[must_use]
    pub const fn retained_wish(&self) -> Option<&Wish> {
        match self {
            Self::Persistence { wish, .. } => Some(wish),
            _ => None,
        }
    }
}

/// Owns the authoritative collection and its durable mirror.
pub struct WishStore<S, P, C = SystemClock> {
    storage: S,
    gate: IdentityGate<P>,
    clock: C,
    wishes: WishCollection,
    state: StoreState,
    load_outcome: Option<LoadOutcome>,
}

impl<S, P> WishStore<S, P, SystemClock>
where
    S: WishStorage,
    P: IdentityProvider,
{
    pub const fn new(storage: S, gate: IdentityGate<P>) -> Self {
        Self::with_clock(storage, gate, SystemClock)
    }
}

impl<S, P, C> WishStore<S, P, C>
where
    S: WishStorage,
    P: IdentityProvider,
    C: Clock,
{
    pub const fn with_clock(storage: S, gate: IdentityGate<P>, clock: C) -> Self {
        Self {
            storage,
            gate,
            clock,
            wishes: WishCollection::new(),
            state: StoreState::Uninitialized,
            load_outcome: None,
        }
    }

    /// Load the persisted collection and enter the Ready state.
    ///
    /// Never fails: an absent, unreadable, or corrupt slot yields an empty
    /// collection. Corrupt bytes are handed to the storage for quarantine
    /// and the next successful submit overwrites the slot.
    pub fn initialize(&mut self) -> WishCollection {
        let (wishes, outcome) = match self.storage.load() {
            Ok(None) => (WishCollection::new(), LoadOutcome::Absent),
            Ok(Some(bytes)) => match WishCollection::from_bytes(&bytes) {
                Ok(wishes) => {
                    let count = wishes.len();
                    (wishes, LoadOutcome::Loaded { count })
                }
                Err(e) => {
                    let quarantined = match self.storage.quarantine(&bytes) {
                        Ok(path) => path,
                        Err(qe) => {
                            tracing::warn!(error = %qe, "could not quarantine corrupt wishes");
                            None
                        }
                    };
                    tracing::warn!(
                        code = %ErrorCode::CorruptPersistedData,
                        error = %e,
                        bytes = bytes.len(),
                        quarantined = ?quarantined,
                        "persisted wishes are corrupt; starting from an empty wall"
                    );
                    (WishCollection::new(), LoadOutcome::Recovered { quarantined })
                }
            },
            Err(e) => {
                tracing::error!(
                    code = %e.code(),
                    error = %e,
                    "persisted wishes unreadable; starting from an empty wall"
                );
                (WishCollection::new(), LoadOutcome::Unreadable)
            }
        };

        tracing::debug!(outcome = ?outcome, count = wishes.len(), "wish store ready");
        self.wishes = wishes;
        self.state = StoreState::Ready;
        self.load_outcome = Some(outcome);
        self.wishes.clone()
    }

    /// Validate, attribute, append, and persist one wish.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::NotInitialized`] before `initialize`.
    /// - [`SubmitError::IdentityRequired`] on a gated wall with no wallet.
    /// - [`SubmitError::EmptyWish`] when the text is blank.
    /// - [`SubmitError::SlotUnreadable`] when the last load could not read
    ///   the slot; nothing is appended.
    /// - [`SubmitError::IdExhausted`] when no id greater than the newest one
    ///   exists.
    /// - [`SubmitError::Persistence`] when the slot write fails; the wish is
    ///   still appended.
    pub fn submit(&mut self, raw_text: &str) -> Result<Wish, SubmitError> {
        self.ensure_ready()?;

        let author = self.gate.author().ok_or(SubmitError::IdentityRequired)?;

        let text = raw_text.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyWish);
        }

        self.ensure_writable()?;

        let timestamp = self.clock.now_millis();
        let id = match self.wishes.max_id() {
            Some(max) if timestamp <= max => max
                .checked_add(1)
                .ok_or(SubmitError::IdExhausted { max })?,
            _ => timestamp,
        };
        let wish = Wish {
            id,
            text: text.to_string(),
            author,
            timestamp,
        };

        self.wishes.push(wish.clone());

        if let Err(source) = self.persist() {
            tracing::warn!(
                id = wish.id,
                code = %source.code(),
                error = %source,
                "wish appended in memory but not persisted"
            );
            return Err(SubmitError::Persistence { wish, source });
        }

        tracing::info!(id = wish.id, author = %wish.author, "wish submitted");
        Ok(wish)
    }

    /// Ordered snapshot of all wishes, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::NotInitialized`] before `initialize`.
    pub fn list(&self) -> Result<WishCollection, SubmitError> {
        self.ensure_ready()?;
        Ok(self.wishes.clone())
    }

    /// Rewrite the slot from the in-memory collection.
    ///
    /// Useful after a [`SubmitError::Persistence`] once storage recovers.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::NotInitialized`] before `initialize`.
    /// - [`SubmitError::SlotUnreadable`] when the last load could not read
    ///   the slot.
    /// - [`SubmitError::Persistence`] carrying the newest wish when the write
    ///   fails, or [`SubmitError::Storage`] when the collection is empty.
    pub fn flush(&mut self) -> Result<(), SubmitError> {
        self.ensure_ready()?;
        self.ensure_writable()?;
        self.persist().map_err(|source| match self.wishes.last() {
            Some(wish) => SubmitError::Persistence {
                wish: wish.clone(),
                source,
            },
            None => SubmitError::Storage(source),
        })
    }

    #[must_use]
    pub const fn state(&self) -> StoreState {
        self.state
    }

    /// Result of the last `initialize`, if any.
    #[must_use]
    pub const fn load_outcome(&self) -> Option<&LoadOutcome> {
        self.load_outcome.as_ref()
    }

    #[must_use]
    pub const fn policy(&self) -> IdentityPolicy {
        self.gate.policy()
    }

    #[must_use]
    pub const fn gate(&self) -> &IdentityGate<P> {
        &self.gate
    }

    pub const fn gate_mut(&mut self) -> &mut IdentityGate<P> {
        &mut self.gate
    }

    const fn ensure_ready(&self) -> Result<(), SubmitError> {
        match self.state {
            StoreState::Ready => Ok(()),
            StoreState::Uninitialized => Err(SubmitError::NotInitialized),
        }
    }

    fn ensure_writable(&self) -> Result<(), SubmitError> {
        if matches!(self.load_outcome, Some(LoadOutcome::Unreadable)) {
            tracing::warn!(
                code = %ErrorCode::UnreadablePersistedData,
                "write refused: stored wishes were not read"
            );
            return Err(SubmitError::SlotUnreadable);
        }
        Ok(())
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        let bytes = self
            .wishes
            .to_bytes()
            .map_err(|e| StorageError::Io(e.into()))?;
        self.storage.save(&bytes)
    }
}
