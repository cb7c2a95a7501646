use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

/// Rejected identifier input (blank after trimming).
#[derive(Debug, ThisError, PartialEq, Eq)]
#[error("{what} must not be empty")]
pub struct InvalidId {
    pub what: &'static str,
}

/// Wallet address identifying a player across both stores.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Parses an address from caller input, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, InvalidId> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidId { what: "address" });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash of a submitted on-chain transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn parse(raw: &str) -> Result<Self, InvalidId> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidId { what: "tx hash" });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque genetic payload attached to a fish at mint time.
///
/// The ledger is authoritative for genetics; this value only transits through
/// the backend between the mint call and the response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genetics(pub [u8; 16]);

impl Genetics {
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl fmt::Display for Genetics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Off-chain player row. Counters are denormalized mirrors of on-chain
/// figures and start at zero; `fish_count` is the occupancy counter bumped
/// when fish are minted for this player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub address: Address,
    pub avatar_ref: Option<String>,
    pub experience: u64,
    pub fish_count: u32,
    pub wins: u32,
    pub reputation: u32,
    pub created_at_ms: u64,
}

impl Player {
    /// A freshly registered player: no avatar, all counters zeroed.
    pub fn registered(address: Address, created_at_ms: u64) -> Self {
        Self {
            address,
            avatar_ref: None,
            experience: 0,
            fish_count: 0,
            wins: 0,
            reputation: 0,
            created_at_ms,
        }
    }
}

/// Off-chain tank row. The id is assigned by the ledger at mint time and
/// shared between both stores; capacity lives on-chain only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tank {
    pub id: i64,
    pub name: String,
    pub owner: Address,
    pub created_at_ms: u64,
}

/// Off-chain fish row. `tank_id` is the occupancy pointer counted against
/// the tank's on-chain capacity. A minted fish has both parents `None`;
/// a bred fish has both `Some`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fish {
    pub id: i64,
    pub owner: Address,
    pub tank_id: Option<i64>,
    pub sprite_ref: Option<String>,
    pub parent1: Option<i64>,
    pub parent2: Option<i64>,
    pub created_at_ms: u64,
}
