use std::future::Future;
use tidepool_types::{Address, Genetics, TxHash};

/// Result of a mint call: the ledger-assigned entity id and the hash of the
/// submitting transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintReceipt {
    pub id: i64,
    pub tx_hash: TxHash,
}

/// Seam to the on-chain ledger client.
///
/// Every call is fallible and may time out; the core wraps any failure as
/// [`crate::Error::OnChain`] uniformly. Timeouts and cancellation belong to
/// the client implementation, not to this core.
pub trait ChainClient: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Submit the on-chain player registration. Idempotent on the ledger
    /// side, but callers are still expected to guard against redundant calls.
    fn register_player(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<TxHash, Self::Error>> + Send;

    /// Mint a tank with the given capacity, owned by `owner`.
    fn mint_tank(
        &self,
        owner: &Address,
        capacity: u32,
    ) -> impl Future<Output = Result<MintReceipt, Self::Error>> + Send;

    /// Mint a fish carrying `genetics`, owned by `owner`.
    fn mint_fish(
        &self,
        owner: &Address,
        genetics: Genetics,
    ) -> impl Future<Output = Result<MintReceipt, Self::Error>> + Send;

    /// Read a tank's on-chain capacity.
    fn tank_capacity(
        &self,
        tank_id: i64,
    ) -> impl Future<Output = Result<u32, Self::Error>> + Send;

    /// Sample a fresh genetic payload for a mint. Sampling is local to the
    /// client and does not cross the wire.
    fn random_genetics(&self) -> Genetics;
}
