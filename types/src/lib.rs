//! Shared domain types for the tidepool backend.
//!
//! These types are split along the two stores they live in: off-chain rows
//! ([`Player`], [`Tank`], [`Fish`], [`SyncQueueItem`]) carry only the columns
//! the relational store owns, while on-chain facts (tank capacity, fish
//! genetics and life-stage) are read through the chain client and never
//! persisted here.

pub mod entity;
pub mod sync;

pub use entity::{Address, Fish, Genetics, InvalidId, Player, Tank, TxHash};
pub use sync::{EntityType, SyncQueueItem, SyncStatus, UnknownVariant};

use std::time::{SystemTime, UNIX_EPOCH};

/// Capacity assigned to a tank minted for a starter pack.
pub const DEFAULT_TANK_CAPACITY: u32 = 10;

/// Number of fish minted alongside the starter tank.
pub const STARTER_PACK_FISH: u32 = 2;

/// Hard cap on lineage traversal depth. A chain longer than this indicates
/// corrupt parent data and fails the walk rather than truncating it.
pub const MAX_LINEAGE_DEPTH: u32 = 50;

/// Current wall-clock time as milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
