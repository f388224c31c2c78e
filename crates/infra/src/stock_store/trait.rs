use std::sync::Arc;

use thiserror::Error;

use brewery_catalog::BeerId;
use brewery_core::ExpectedVersion;
use brewery_inventory::StockRecord;

/// Stock store operation error.
///
/// These are **infrastructure errors** (missing rows, stale versions, an
/// unusable backend) as opposed to stock rule violations, which are reported by
/// `StockError` before the store is ever touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockStoreError {
    #[error("no stock record for beer {0}")]
    NotFound(BeerId),

    #[error("stock record for beer {0} already exists")]
    AlreadyExists(BeerId),

    /// The stored version no longer matches the version the write was based on.
    #[error("optimistic concurrency check failed for beer {beer_id}: expected {expected:?}, found {actual}")]
    Conflict {
        beer_id: BeerId,
        expected: ExpectedVersion,
        actual: u64,
    },

    /// A multi-row save named the same beer twice; nothing was written.
    #[error("batch names beer {0} more than once")]
    DuplicateInBatch(BeerId),

    #[error("stock store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence boundary for stock records (load current state / save new state).
///
/// ## Write semantics
///
/// `save()` is a compare-and-swap: the write is applied only if the stored
/// record's version matches `expected_version`, otherwise it fails with
/// `Conflict` and nothing changes. Records of different beers never conflict.
///
/// `save_all()` applies a batch atomically: every row's expected version is
/// checked first and either all rows are written or none are.
///
/// ## Implementation requirements
///
/// - Version checks and writes must be atomic per call.
/// - `save_all` must not expose a partially applied batch to readers.
/// - `list()` returns records ordered by `BeerId`.
pub trait StockStore: Send + Sync {
    fn load(&self, beer_id: BeerId) -> Result<StockRecord, StockStoreError>;

    fn list(&self) -> Result<Vec<StockRecord>, StockStoreError>;

    /// Insert a freshly opened record. Fails with `AlreadyExists` if the beer is tracked.
    fn insert(&self, record: StockRecord) -> Result<(), StockStoreError>;

    fn save(
        &self,
        record: StockRecord,
        expected_version: ExpectedVersion,
    ) -> Result<(), StockStoreError>;

    fn save_all(
        &self,
        batch: Vec<(StockRecord, ExpectedVersion)>,
    ) -> Result<(), StockStoreError>;

    /// Remove a record, returning it.
    fn remove(&self, beer_id: BeerId) -> Result<StockRecord, StockStoreError>;
}

impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    fn load(&self, beer_id: BeerId) -> Result<StockRecord, StockStoreError> {
        (**self).load(beer_id)
    }

    fn list(&self) -> Result<Vec<StockRecord>, StockStoreError> {
        (**self).list()
    }

    fn insert(&self, record: StockRecord) -> Result<(), StockStoreError> {
        (**self).insert(record)
    }

    fn save(
        &self,
        record: StockRecord,
        expected_version: ExpectedVersion,
    ) -> Result<(), StockStoreError> {
        (**self).save(record, expected_version)
    }

    fn save_all(
        &self,
        batch: Vec<(StockRecord, ExpectedVersion)>,
    ) -> Result<(), StockStoreError> {
        (**self).save_all(batch)
    }

    fn remove(&self, beer_id: BeerId) -> Result<StockRecord, StockStoreError> {
        (**self).remove(beer_id)
    }
}
