use crate::entity::TxHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error as ThisError;

/// A string that does not name any variant of a fixed enum.
#[derive(Debug, ThisError, PartialEq, Eq)]
#[error("unknown {what}: {got:?} (valid values: {valid})")]
pub struct UnknownVariant {
    pub what: &'static str,
    pub got: String,
    pub valid: &'static str,
}

/// Kind of entity a sync-queue entry tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Player,
    Fish,
    Tank,
    Decoration,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Fish => "fish",
            Self::Tank => "tank",
            Self::Decoration => "decoration",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "player" => Ok(Self::Player),
            "fish" => Ok(Self::Fish),
            "tank" => Ok(Self::Tank),
            "decoration" => Ok(Self::Decoration),
            _ => Err(UnknownVariant {
                what: "entity type",
                got: value.to_string(),
                valid: "player, fish, tank, decoration",
            }),
        }
    }
}

/// Confirmation lifecycle of a submitted transaction.
///
/// Entries are created `pending`; an external confirmation process moves
/// them to `confirmed` or `failed`. Every transition to `failed` increments
/// the entry's retry count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Confirmed,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "failed" => Ok(Self::Failed),
            _ => Err(UnknownVariant {
                what: "sync status",
                got: value.to_string(),
                valid: "pending, confirmed, failed",
            }),
        }
    }
}

/// One row per submitted on-chain transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    pub tx_hash: TxHash,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub status: SyncStatus,
    pub retry_count: u32,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}
