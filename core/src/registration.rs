use crate::{
    capacity::CapacityGuard, chain::ChainClient, sync_queue::LedgerSyncTracker, Error, Result,
};
use serde::Serialize;
use std::sync::Arc;
use tidepool_store::{FishStore, PlayerStore, SyncQueueStore, TankStore};
use tidepool_types::{
    now_ms, Address, EntityType, Fish, Player, Tank, TxHash, DEFAULT_TANK_CAPACITY,
    STARTER_PACK_FISH,
};
use tracing::{info, warn};

/// Display name given to the tank minted in a starter pack.
const STARTER_TANK_NAME: &str = "Starter Tank";

/// Tunables for the registration orchestration.
#[derive(Clone, Debug, Serialize)]
pub struct CoreConfig {
    pub starter_pack_fish: u32,
    pub starter_tank_capacity: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            starter_pack_fish: STARTER_PACK_FISH,
            starter_tank_capacity: DEFAULT_TANK_CAPACITY,
        }
    }
}

/// Outcome of a registration, distinguishing the idempotent fast path from
/// an actual dual-store write. The third state of the dual-write model —
/// off-chain row without on-chain backing — is an [`Error::OnChain`] whose
/// partial effects stay visible in the store.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RegisterOutcome {
    /// The player already had an off-chain row; the on-chain registration
    /// call was not repeated.
    Existing { player: Player },
    /// A new off-chain row was created and the on-chain registration was
    /// submitted (not yet confirmed).
    Registered { player: Player, tx_hash: TxHash },
}

impl RegisterOutcome {
    pub fn player(&self) -> &Player {
        match self {
            Self::Existing { player } | Self::Registered { player, .. } => player,
        }
    }
}

/// The one-time initial grant: one tank plus a fixed number of fish.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StarterPack {
    pub tank_id: i64,
    pub fish_ids: Vec<i64>,
}

/// Orchestrates player registration and starter-pack minting across the
/// off-chain store and the on-chain ledger.
pub struct Registrar<S, C> {
    store: Arc<S>,
    chain: C,
    tracker: LedgerSyncTracker<S>,
    capacity: CapacityGuard<S, C>,
    config: CoreConfig,
}

impl<S, C> Registrar<S, C>
where
    S: PlayerStore + TankStore + FishStore + SyncQueueStore,
    C: ChainClient,
{
    pub fn new(store: Arc<S>, chain: C, config: CoreConfig) -> Self {
        let tracker = LedgerSyncTracker::new(Arc::clone(&store));
        let capacity = CapacityGuard::new(Arc::clone(&store), chain.clone());
        Self {
            store,
            chain,
            tracker,
            capacity,
            config,
        }
    }

    /// Registers a player under `address`.
    ///
    /// Idempotent for callers: a second call returns the existing off-chain
    /// row unchanged and never repeats the on-chain call. If the on-chain
    /// call fails after the off-chain insert, the row is left in place
    /// (rolling back a row other requests may already read is unsafe without
    /// coordination) and the failure surfaces as [`Error::OnChain`].
    pub async fn register_player(&self, address: &str) -> Result<RegisterOutcome> {
        let address = Address::parse(address)
            .map_err(|_| Error::validation("address", "must not be empty"))?;

        if let Some(existing) = self.store.player_by_address(&address)? {
            return Ok(RegisterOutcome::Existing { player: existing });
        }

        let player = Player::registered(address.clone(), now_ms());
        self.store.insert_player(&player)?;

        let tx_hash = match self.chain.register_player(&address).await {
            Ok(tx_hash) => tx_hash,
            Err(err) => {
                warn!(
                    address = %address,
                    "on-chain registration failed; off-chain row left for reconciliation"
                );
                return Err(Error::on_chain("register_player", err));
            }
        };
        self.track(&tx_hash, EntityType::Player, address.as_str());

        info!(address = %address, tx_hash = %tx_hash, "registered player");
        Ok(RegisterOutcome::Registered { player, tx_hash })
    }

    /// Mints the starter pack for `address`: one tank plus
    /// `config.starter_pack_fish` fish, granted at most once per player.
    ///
    /// The "already granted" guard is a check on existing tank ownership,
    /// not a lock; two concurrent calls can both pass it (crate docs).
    /// Fish already minted when a later mint fails are not rolled back.
    pub async fn mint_starter_pack(&self, address: &str) -> Result<StarterPack> {
        let address = Address::parse(address)
            .map_err(|_| Error::validation("address", "must not be empty"))?;
        let player = self
            .store
            .player_by_address(&address)?
            .ok_or_else(|| Error::not_found("player", &address))?;

        if !self.store.tanks_by_owner(&address)?.is_empty() {
            return Err(Error::StarterPackGranted {
                address: address.to_string(),
            });
        }

        let tank = self
            .chain
            .mint_tank(&address, self.config.starter_tank_capacity)
            .await
            .map_err(|e| Error::on_chain("mint_tank", e))?;
        self.store.insert_tank(&Tank {
            id: tank.id,
            name: STARTER_TANK_NAME.to_string(),
            owner: address.clone(),
            created_at_ms: now_ms(),
        })?;
        self.track(&tank.tx_hash, EntityType::Tank, &tank.id.to_string());

        self.capacity
            .check_capacity(tank.id, self.config.starter_pack_fish)
            .await?;

        let mut fish_ids = Vec::with_capacity(self.config.starter_pack_fish as usize);
        for _ in 0..self.config.starter_pack_fish {
            let genetics = self.chain.random_genetics();
            let minted = match self.chain.mint_fish(&address, genetics).await {
                Ok(minted) => minted,
                Err(err) => {
                    warn!(
                        address = %address,
                        tank_id = tank.id,
                        minted = fish_ids.len(),
                        "starter pack interrupted mid-mint; earlier mints kept"
                    );
                    return Err(Error::on_chain("mint_fish", err));
                }
            };
            self.store.insert_fish(&Fish {
                id: minted.id,
                owner: address.clone(),
                tank_id: Some(tank.id),
                sprite_ref: None,
                parent1: None,
                parent2: None,
                created_at_ms: now_ms(),
            })?;
            self.track(&minted.tx_hash, EntityType::Fish, &minted.id.to_string());
            fish_ids.push(minted.id);
        }

        self.store
            .set_fish_count(&address, player.fish_count + fish_ids.len() as u32)?;

        info!(
            address = %address,
            tank_id = tank.id,
            fish = fish_ids.len(),
            "minted starter pack"
        );
        Ok(StarterPack {
            tank_id: tank.id,
            fish_ids,
        })
    }

    /// The tracker confirms transactions out of band; a tracking failure must
    /// not fail an orchestration whose ledger writes already happened.
    fn track(&self, tx_hash: &TxHash, entity_type: EntityType, entity_id: &str) {
        if let Err(err) = self
            .tracker
            .enqueue(tx_hash.as_str(), entity_type, entity_id)
        {
            warn!(tx_hash = %tx_hash, %err, "failed to track submitted transaction");
        }
    }
}
