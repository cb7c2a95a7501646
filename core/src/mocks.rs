//! Mock on-chain client for tests (and downstream crates via the `mocks`
//! feature): deterministic ids, seeded genetics, call counters for
//! idempotency assertions, and scriptable failure injection.

use crate::chain::{ChainClient, MintReceipt};
use rand::{rngs::StdRng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tidepool_types::{Address, Genetics, TxHash};

#[derive(Error, Debug)]
#[error("mock chain failure: {0}")]
pub struct MockChainError(pub &'static str);

#[derive(Clone)]
pub struct MockChain {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    next_id: i64,
    next_tx: u64,
    rng: StdRng,
    capacities: HashMap<i64, u32>,
    register_calls: u32,
    mint_tank_calls: u32,
    mint_fish_calls: u32,
    fail_register: bool,
    fail_mint_tank: bool,
    fail_capacity: bool,
    // Number of further mint_fish calls to allow before failing.
    fail_mint_fish_after: Option<u32>,
}

impl MockChain {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 1,
                next_tx: 1,
                rng: StdRng::seed_from_u64(seed),
                capacities: HashMap::new(),
                register_calls: 0,
                mint_tank_calls: 0,
                mint_fish_calls: 0,
                fail_register: false,
                fail_mint_tank: false,
                fail_capacity: false,
                fail_mint_fish_after: None,
            })),
        }
    }

    pub fn register_calls(&self) -> u32 {
        self.inner.lock().unwrap().register_calls
    }

    pub fn mint_tank_calls(&self) -> u32 {
        self.inner.lock().unwrap().mint_tank_calls
    }

    pub fn mint_fish_calls(&self) -> u32 {
        self.inner.lock().unwrap().mint_fish_calls
    }

    pub fn fail_registrations(&self) {
        self.inner.lock().unwrap().fail_register = true;
    }

    pub fn fail_tank_mints(&self) {
        self.inner.lock().unwrap().fail_mint_tank = true;
    }

    pub fn fail_capacity_reads(&self) {
        self.inner.lock().unwrap().fail_capacity = true;
    }

    /// Allow `n` more successful `mint_fish` calls, then fail each one after.
    pub fn fail_mint_fish_after(&self, n: u32) {
        self.inner.lock().unwrap().fail_mint_fish_after = Some(n);
    }

    /// Seed a capacity for a tank that was not minted through this mock.
    pub fn set_capacity(&self, tank_id: i64, capacity: u32) {
        self.inner.lock().unwrap().capacities.insert(tank_id, capacity);
    }
}

impl Inner {
    fn next_tx_hash(&mut self) -> TxHash {
        let tx = self.next_tx;
        self.next_tx += 1;
        TxHash::parse(&format!("0x{tx:08x}")).expect("mock tx hash is non-empty")
    }

    fn next_entity_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl ChainClient for MockChain {
    type Error = MockChainError;

    async fn register_player(&self, _address: &Address) -> Result<TxHash, MockChainError> {
        let mut inner = self.inner.lock().unwrap();
        inner.register_calls += 1;
        if inner.fail_register {
            return Err(MockChainError("register_player rejected"));
        }
        Ok(inner.next_tx_hash())
    }

    async fn mint_tank(
        &self,
        _owner: &Address,
        capacity: u32,
    ) -> Result<MintReceipt, MockChainError> {
        let mut inner = self.inner.lock().unwrap();
        inner.mint_tank_calls += 1;
        if inner.fail_mint_tank {
            return Err(MockChainError("mint_tank rejected"));
        }
        let id = inner.next_entity_id();
        inner.capacities.insert(id, capacity);
        let tx_hash = inner.next_tx_hash();
        Ok(MintReceipt { id, tx_hash })
    }

    async fn mint_fish(
        &self,
        _owner: &Address,
        _genetics: Genetics,
    ) -> Result<MintReceipt, MockChainError> {
        let mut inner = self.inner.lock().unwrap();
        inner.mint_fish_calls += 1;
        if let Some(remaining) = inner.fail_mint_fish_after {
            if remaining == 0 {
                return Err(MockChainError("mint_fish rejected"));
            }
            inner.fail_mint_fish_after = Some(remaining - 1);
        }
        let id = inner.next_entity_id();
        let tx_hash = inner.next_tx_hash();
        Ok(MintReceipt { id, tx_hash })
    }

    async fn tank_capacity(&self, tank_id: i64) -> Result<u32, MockChainError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_capacity {
            return Err(MockChainError("tank_capacity unavailable"));
        }
        inner
            .capacities
            .get(&tank_id)
            .copied()
            .ok_or(MockChainError("unknown tank"))
    }

    fn random_genetics(&self) -> Genetics {
        Genetics::random(&mut self.inner.lock().unwrap().rng)
    }
}
