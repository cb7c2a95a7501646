use crate::{chain::ChainClient, Error, Result};
use std::sync::Arc;
use tidepool_store::{FishStore, TankStore};
use tracing::debug;

/// Advisory admission check for tank occupancy.
///
/// Capacity lives on-chain, occupancy off-chain, so this cannot be a
/// database constraint. The check holds no lock: callers that mutate after
/// checking must re-check if time has passed, and two concurrent admissions
/// can both pass (see crate docs).
pub struct CapacityGuard<S, C> {
    store: Arc<S>,
    chain: C,
}

impl<S, C> CapacityGuard<S, C>
where
    S: TankStore + FishStore,
    C: ChainClient,
{
    pub fn new(store: Arc<S>, chain: C) -> Self {
        Self { store, chain }
    }

    /// Succeeds iff the tank can admit `additional` more fish, i.e.
    /// `occupancy + additional <= capacity`. Exact equality is admitted.
    /// No side effects.
    pub async fn check_capacity(&self, tank_id: i64, additional: u32) -> Result<()> {
        if self.store.tank_by_id(tank_id)?.is_none() {
            return Err(Error::not_found("tank", tank_id));
        }

        let capacity = self
            .chain
            .tank_capacity(tank_id)
            .await
            .map_err(|e| Error::on_chain("tank_capacity", e))?;
        let occupancy = self.store.fish_count_in_tank(tank_id)?;

        if occupancy + additional > capacity {
            return Err(Error::TankFull {
                tank_id,
                occupancy,
                capacity,
                requested: additional,
            });
        }
        debug!(tank_id, occupancy, capacity, additional, "capacity check passed");
        Ok(())
    }
}
