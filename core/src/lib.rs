//! Tidepool reconciliation core.
//!
//! This crate holds the only non-CRUD logic of the backend: the orchestration
//! that keeps the mutable off-chain store and the immutable on-chain ledger
//! consistent under partial failure, and the lineage engine that rebuilds
//! ancestry graphs from the self-referential fish table.
//!
//! ## Consistency model
//! There is no two-phase commit across the two stores. Within one
//! orchestration every on-chain call is awaited before the off-chain row that
//! references its result is written. An on-chain failure after an off-chain
//! write is surfaced as [`Error::OnChain`] and the partial state is left in
//! place for an external sweeper, which discovers unconfirmed work through
//! [`LedgerSyncTracker::list_pending`]. Nothing here rolls back, retries, or
//! blocks on confirmation.
//!
//! ## Admission checks are advisory
//! [`CapacityGuard::check_capacity`] and the starter-pack "already granted"
//! guard are check-then-act without a lock; the time-of-check-to-time-of-use
//! races are documented behavior, not bugs to paper over here.

pub mod capacity;
pub mod chain;
pub mod lineage;
pub mod registration;
pub mod sync_queue;

mod error;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(test)]
mod lineage_tests;

pub use capacity::CapacityGuard;
pub use chain::{ChainClient, MintReceipt};
pub use error::{Error, ErrorKind, Result};
pub use lineage::{FamilyTree, LineageEngine, LineageNode};
pub use registration::{CoreConfig, RegisterOutcome, Registrar, StarterPack};
pub use sync_queue::LedgerSyncTracker;
