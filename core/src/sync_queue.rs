use crate::{Error, Result};
use std::sync::Arc;
use tidepool_store::{StoreError, SyncQueueStore};
use tidepool_types::{now_ms, EntityType, SyncQueueItem, SyncStatus, TxHash};
use tracing::debug;

/// Tracking table for submitted on-chain transactions.
///
/// One entry per tx hash, created `pending` when a transaction is submitted.
/// An external confirmation sweeper moves entries to `confirmed` or `failed`
/// through [`update_status`](Self::update_status) and discovers outstanding
/// work through [`list_pending`](Self::list_pending); this core never runs a
/// background task of its own. Entries are never deleted here.
pub struct LedgerSyncTracker<Q> {
    store: Arc<Q>,
}

impl<Q> Clone for LedgerSyncTracker<Q> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<Q: SyncQueueStore> LedgerSyncTracker<Q> {
    pub fn new(store: Arc<Q>) -> Self {
        Self { store }
    }

    /// Records a newly submitted transaction as `pending` with a zero retry
    /// count. A duplicate hash is a caller error (`Validation`), not a raw
    /// storage error.
    pub fn enqueue(
        &self,
        tx_hash: &str,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<SyncQueueItem> {
        let tx_hash = TxHash::parse(tx_hash)
            .map_err(|_| Error::validation("tx_hash", "must not be empty"))?;
        let entity_id = entity_id.trim();
        if entity_id.is_empty() {
            return Err(Error::validation("entity_id", "must not be empty"));
        }

        let now = now_ms();
        let item = SyncQueueItem {
            tx_hash,
            entity_type,
            entity_id: entity_id.to_string(),
            status: SyncStatus::Pending,
            retry_count: 0,
            created_at_ms: now,
            updated_at_ms: now,
        };
        match self.store.insert_item(&item) {
            Ok(()) => {
                debug!(tx_hash = %item.tx_hash, entity_type = %entity_type, "enqueued sync entry");
                Ok(item)
            }
            Err(StoreError::UniqueViolation) => Err(Error::validation(
                "tx_hash",
                format!("{} is already enqueued", item.tx_hash),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Transitions an entry to a new status. A transition to `failed` reads
    /// the currently stored retry count and writes its increment with the
    /// status; the read happens immediately before the write to keep the
    /// lost-update window small (there is no transactional RMW here, see
    /// crate docs).
    pub fn update_status(&self, tx_hash: &str, status: SyncStatus) -> Result<SyncQueueItem> {
        let tx_hash = TxHash::parse(tx_hash)
            .map_err(|_| Error::validation("tx_hash", "must not be empty"))?;
        let current = self
            .store
            .item_by_tx_hash(&tx_hash)?
            .ok_or_else(|| Error::not_found("sync queue entry", &tx_hash))?;

        let retry_count = match status {
            SyncStatus::Failed => current.retry_count + 1,
            _ => current.retry_count,
        };
        let updated = self
            .store
            .update_item_status(&tx_hash, status, retry_count, now_ms())
            .map_err(|err| match err {
                StoreError::NotFound => Error::not_found("sync queue entry", &tx_hash),
                other => other.into(),
            })?;
        debug!(tx_hash = %tx_hash, status = %status, retry_count, "updated sync entry");
        Ok(updated)
    }

    /// Marks a transaction confirmed. Retry count is untouched.
    pub fn mark_confirmed(&self, tx_hash: &str) -> Result<SyncQueueItem> {
        self.update_status(tx_hash, SyncStatus::Confirmed)
    }

    /// Marks a transaction failed, incrementing its retry count.
    pub fn mark_failed(&self, tx_hash: &str) -> Result<SyncQueueItem> {
        self.update_status(tx_hash, SyncStatus::Failed)
    }

    /// All `pending` entries, oldest-created first, so a sweeper retries
    /// fairly. Empty when nothing is outstanding.
    pub fn list_pending(&self) -> Result<Vec<SyncQueueItem>> {
        Ok(self.store.pending_items()?)
    }

    /// Point lookup by hash. Absence is `Ok(None)`, not an error.
    pub fn find_by_tx_hash(&self, tx_hash: &str) -> Result<Option<SyncQueueItem>> {
        let tx_hash = TxHash::parse(tx_hash)
            .map_err(|_| Error::validation("tx_hash", "must not be empty"))?;
        Ok(self.store.item_by_tx_hash(&tx_hash)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tidepool_store::SqliteStore;

    fn tracker() -> LedgerSyncTracker<SqliteStore> {
        LedgerSyncTracker::new(Arc::new(SqliteStore::open_in_memory().unwrap()))
    }

    #[test]
    fn enqueue_creates_pending_entry() {
        let tracker = tracker();
        let item = tracker
            .enqueue("0xabc", EntityType::Player, "0xowner")
            .expect("enqueue should succeed");
        assert_eq!(item.status, SyncStatus::Pending);
        assert_eq!(item.retry_count, 0);

        let found = tracker.find_by_tx_hash("0xabc").unwrap();
        assert_eq!(found.as_ref().map(|i| i.entity_id.as_str()), Some("0xowner"));
    }

    #[test]
    fn enqueue_rejects_blank_inputs() {
        let tracker = tracker();
        let err = tracker.enqueue("  ", EntityType::Player, "1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = tracker.enqueue("0x1", EntityType::Player, "  ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn duplicate_hash_is_validation_not_storage_error() {
        let tracker = tracker();
        tracker.enqueue("0xabc", EntityType::Fish, "1").unwrap();
        let err = tracker.enqueue("0xabc", EntityType::Fish, "2").unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::Validation,
            "unique-constraint collision must be translated"
        );
    }

    #[test]
    fn failed_increments_retry_count_per_call() {
        let tracker = tracker();
        tracker.enqueue("0xabc", EntityType::Tank, "7").unwrap();

        let first = tracker.mark_failed("0xabc").unwrap();
        assert_eq!(first.retry_count, 1);
        let second = tracker.mark_failed("0xabc").unwrap();
        assert_eq!(second.retry_count, 2, "failed -> failed keeps incrementing");

        let confirmed = tracker.mark_confirmed("0xabc").unwrap();
        assert_eq!(confirmed.retry_count, 2, "confirmed leaves retry count alone");
        assert_eq!(confirmed.status, SyncStatus::Confirmed);
    }

    #[test]
    fn update_unknown_hash_is_not_found() {
        let tracker = tracker();
        let err = tracker.mark_confirmed("0xmissing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn list_pending_is_fifo_and_excludes_settled() {
        let tracker = tracker();
        tracker.enqueue("0x1", EntityType::Fish, "1").unwrap();
        tracker.enqueue("0x2", EntityType::Fish, "2").unwrap();
        tracker.enqueue("0x3", EntityType::Fish, "3").unwrap();
        tracker.mark_confirmed("0x2").unwrap();

        let pending = tracker.list_pending().unwrap();
        let hashes: Vec<&str> = pending.iter().map(|i| i.tx_hash.as_str()).collect();
        assert_eq!(hashes, vec!["0x1", "0x3"]);
    }

    #[test]
    fn list_pending_empty_is_ok() {
        let tracker = tracker();
        assert!(tracker.list_pending().unwrap().is_empty());
    }

    #[test]
    fn find_by_missing_hash_is_none() {
        let tracker = tracker();
        assert!(tracker.find_by_tx_hash("0xnone").unwrap().is_none());
        assert_eq!(
            tracker.find_by_tx_hash("").unwrap_err().kind(),
            ErrorKind::Validation
        );
    }
}
