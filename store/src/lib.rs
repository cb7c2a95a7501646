//! Off-chain relational store for the tidepool backend.
//!
//! The store is the mutable side of the dual-store pair: it holds metadata
//! the ledger does not record (names, sprites, parent pointers, the sync
//! queue) and is queried by the reconciliation core through the narrow
//! traits below. Absence on point lookups is `Ok(None)`, not an error; the
//! two failure codes callers must be able to tell apart are `NotFound` for
//! missing update targets and `UniqueViolation` for key collisions.

mod sqlite;

pub use sqlite::SqliteStore;

use thiserror::Error;
use tidepool_types::{Address, Fish, Player, SyncQueueItem, SyncStatus, Tank, TxHash};

/// Store-level failure taxonomy. `NotFound` and `UniqueViolation` are
/// translated by the core into its own error kinds; anything else is an
/// unclassified backend failure and is propagated, never swallowed.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("backend failure: {0}")]
    Backend(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Player rows, keyed by wallet address.
pub trait PlayerStore: Send + Sync {
    fn player_by_address(&self, address: &Address) -> Result<Option<Player>>;

    /// Inserts a new player row. `UniqueViolation` if the address exists.
    fn insert_player(&self, player: &Player) -> Result<()>;

    /// Overwrites the denormalized fish counter. `NotFound` if no row.
    fn set_fish_count(&self, address: &Address, fish_count: u32) -> Result<()>;
}

/// Tank rows, keyed by the ledger-assigned id.
pub trait TankStore: Send + Sync {
    fn tank_by_id(&self, id: i64) -> Result<Option<Tank>>;

    fn insert_tank(&self, tank: &Tank) -> Result<()>;

    /// All tanks owned by `owner`, oldest first.
    fn tanks_by_owner(&self, owner: &Address) -> Result<Vec<Tank>>;
}

/// Fish rows, keyed by the ledger-assigned id.
pub trait FishStore: Send + Sync {
    fn fish_by_id(&self, id: i64) -> Result<Option<Fish>>;

    fn insert_fish(&self, fish: &Fish) -> Result<()>;

    /// Number of fish currently assigned to `tank_id` (the occupancy side
    /// of the capacity check).
    fn fish_count_in_tank(&self, tank_id: i64) -> Result<u32>;

    /// All fish with either parent pointer in `parent_ids` (one descendant
    /// level of the lineage graph).
    fn fish_by_parent_ids(&self, parent_ids: &[i64]) -> Result<Vec<Fish>>;
}

/// Sync-queue rows, keyed by transaction hash. Rows are never deleted here;
/// archival is a concern of whatever owns the database, not this core.
pub trait SyncQueueStore: Send + Sync {
    /// Inserts a new entry. `UniqueViolation` if the hash is already queued.
    fn insert_item(&self, item: &SyncQueueItem) -> Result<()>;

    fn item_by_tx_hash(&self, tx_hash: &TxHash) -> Result<Option<SyncQueueItem>>;

    /// Writes status and retry count in one statement and returns the
    /// updated row. `NotFound` if the hash has no entry.
    fn update_item_status(
        &self,
        tx_hash: &TxHash,
        status: SyncStatus,
        retry_count: u32,
        updated_at_ms: u64,
    ) -> Result<SyncQueueItem>;

    /// All `pending` entries, oldest-created first.
    fn pending_items(&self) -> Result<Vec<SyncQueueItem>>;
}
