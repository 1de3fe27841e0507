//! wishwall-core library.
//!
//! A [`store::WishStore`] owns the wall: it asks an
//! [`identity::IdentityGate`] who is submitting, validates the text, appends
//! the [`model::Wish`], and rewrites the whole collection through a
//! [`storage::WishStorage`] port.
//!
//! # Conventions
//!
//! - **Errors**: `anyhow::Result` for config plumbing, typed `thiserror`
//!   enums at the store boundary.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod identity;
pub mod lock;
pub mod model;
pub mod session;
pub mod storage;
pub mod store;

use std::path::Path;

pub use identity::{GateSettings, IdentityGate, IdentityPolicy, IdentityProvider};
pub use model::{Wish, WishCollection};
pub use storage::{FileSlot, MemorySlot, WishStorage};
pub use store::{LoadOutcome, StoreState, SubmitError, WishStore};

/// Build an uninitialized store for the wall under `project_root`, using
/// the slot and gate settings from `wall`.
pub fn open_wall<P: IdentityProvider>(
    project_root: &Path,
    wall: &config::WallConfig,
    provider: P,
) -> WishStore<FileSlot, P> {
    let wall_dir = config::wall_dir(project_root);
    let gate = IdentityGate::new(provider, wall.gate_settings());
    tracing::debug!(policy = %gate.policy(), dir = %wall_dir.display(), "opening wall");
    WishStore::new(wall.file_slot(&wall_dir), gate)
}
