//! Stock ledger: every read-modify-write against a stock record.
//!
//! ```text
//! caller
//!   ↓
//! 1. Load the current record (and its version)
//!   ↓
//! 2. Apply the pure mutation (StockRecord::decrease / increase / clear)
//!   ↓
//! 3. Save under ExpectedVersion::Exact(loaded version)
//!   ↓  conflict → reload and retry, bounded by `max_conflict_retries`
//! 4. Publish the StockEvent (only after the save succeeded)
//! ```
//!
//! The quantity check in step 2 is always evaluated against the record that
//! step 3 compares versions with, so two writers can never both pass the
//! check on the same units.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::thread;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use brewery_catalog::{BeerId, ExpiryPolicy};
use brewery_core::ExpectedVersion;
use brewery_events::{EventBus, EventEnvelope};
use brewery_inventory::{
    StatusClassifier, StockCleared, StockDecreased, StockError, StockEvent, StockIncreased,
    StockOpened, StockRecord, StockStatus,
};

use crate::catalog::{CatalogError, CatalogLookup};
use crate::stock_store::{StockStore, StockStoreError};

/// Aggregate type stamped on every published stock envelope.
pub const STOCK_AGGREGATE_TYPE: &str = "inventory.stock";

pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("no stock record for beer {0}")]
    NotFound(BeerId),

    #[error("invalid amount: {amount}")]
    InvalidAmount { amount: i64 },

    #[error("insufficient stock for beer {beer_id}: available {available}, requested {requested}")]
    InsufficientStock {
        beer_id: BeerId,
        available: i64,
        requested: i64,
    },

    /// Every attempt lost the optimistic concurrency race.
    #[error("stock record for beer {beer_id} still contended after {attempts} attempts")]
    Conflict { beer_id: BeerId, attempts: u32 },

    #[error("beer {0} already has a stock record")]
    AlreadyTracked(BeerId),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(StockStoreError),
}

impl From<StockStoreError> for LedgerError {
    fn from(value: StockStoreError) -> Self {
        match value {
            StockStoreError::NotFound(beer_id) => LedgerError::NotFound(beer_id),
            StockStoreError::AlreadyExists(beer_id) => LedgerError::AlreadyTracked(beer_id),
            other => LedgerError::Store(other),
        }
    }
}

impl LedgerError {
    /// Map a stock rule violation for a mutation of `amount` units.
    ///
    /// Overflow is reported as an invalid amount: the caller asked for more
    /// than the quantity type can hold.
    fn from_stock(err: StockError, amount: i64) -> Self {
        match err {
            StockError::InvalidAmount { amount } => LedgerError::InvalidAmount { amount },
            StockError::InsufficientStock {
                beer_id,
                available,
                requested,
            } => LedgerError::InsufficientStock {
                beer_id,
                available,
                requested,
            },
            StockError::Overflow { .. } => LedgerError::InvalidAmount { amount },
        }
    }

    /// Request rejections that retrying can never fix.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::NotFound(_)
                | LedgerError::InvalidAmount { .. }
                | LedgerError::InsufficientStock { .. }
                | LedgerError::AlreadyTracked(_)
                | LedgerError::Store(StockStoreError::DuplicateInBatch(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Decrease,
    Increase,
    Clear,
}

/// Auditable outcome of a committed ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockMovement {
    pub beer_id: BeerId,
    pub kind: MovementKind,
    pub amount: i64,
    pub quantity_before: i64,
    pub quantity: i64,
    pub status: StockStatus,
    pub version: u64,
    pub at: DateTime<Utc>,
}

struct Commit {
    before: StockRecord,
    after: StockRecord,
}

enum Change<K> {
    Write(StockRecord),
    Skip(K),
}

enum Outcome<K> {
    Committed(Commit),
    Skipped(K),
}

/// The stock engine. Cheap to share behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct StockLedger<S, C, B> {
    store: S,
    catalog: C,
    bus: B,
    classifier: StatusClassifier,
    expiry: ExpiryPolicy,
    max_conflict_retries: u32,
}

impl<S, C, B> StockLedger<S, C, B>
where
    S: StockStore,
    C: CatalogLookup,
    B: EventBus<EventEnvelope<StockEvent>>,
{
    pub fn new(store: S, catalog: C, bus: B) -> Self {
        Self {
            store,
            catalog,
            bus,
            classifier: StatusClassifier::default(),
            expiry: ExpiryPolicy::default(),
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }

    pub fn with_classifier(mut self, classifier: StatusClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_expiry_policy(mut self, expiry: ExpiryPolicy) -> Self {
        self.expiry = expiry;
        self
    }

    /// Total save attempts per operation (at least one).
    pub fn with_max_conflict_retries(mut self, attempts: u32) -> Self {
        self.max_conflict_retries = attempts.max(1);
        self
    }

    pub fn classifier(&self) -> &StatusClassifier {
        &self.classifier
    }

    pub fn expiry_policy(&self) -> &ExpiryPolicy {
        &self.expiry
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Start tracking stock for a catalog beer.
    pub fn open(&self, beer_id: BeerId, initial_quantity: i64) -> Result<StockRecord, LedgerError> {
        self.catalog.resolve(beer_id)?;

        let record = StockRecord::open(beer_id, initial_quantity, &self.classifier, Utc::now())
            .map_err(|e| LedgerError::from_stock(e, initial_quantity))?;
        self.store.insert(record.clone())?;

        info!(beer_id = %beer_id, quantity = initial_quantity, status = ?record.status(), "stock record opened");
        self.publish(
            &record,
            StockEvent::StockOpened(StockOpened {
                beer_id,
                quantity: record.quantity(),
                status: record.status(),
                occurred_at: record.last_update(),
            }),
        );
        Ok(record)
    }

    /// Remove `amount` units (sale or loss).
    pub fn decrease(&self, beer_id: BeerId, amount: i64) -> Result<StockMovement, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }

        let commit = self.commit(beer_id, |current, at| {
            current
                .decrease(amount, &self.classifier, at)
                .map_err(|e| LedgerError::from_stock(e, amount))
        })?;

        Ok(self.settle(commit, MovementKind::Decrease, amount))
    }

    /// Add `amount` units (restock).
    pub fn increase(&self, beer_id: BeerId, amount: i64) -> Result<StockMovement, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount { amount });
        }

        let commit = self.commit(beer_id, |current, at| {
            current
                .increase(amount, &self.classifier, at)
                .map_err(|e| LedgerError::from_stock(e, amount))
        })?;

        Ok(self.settle(commit, MovementKind::Increase, amount))
    }

    /// All-or-nothing decrement of several beers.
    ///
    /// Demand is summed per beer, so two lines for the same beer are checked
    /// against the on-hand quantity together. Rows are validated against one
    /// snapshot and committed with a single `save_all`; if any row is short,
    /// no row changes.
    pub fn decrease_many(&self, lines: &[(BeerId, i64)]) -> Result<Vec<StockMovement>, LedgerError> {
        let mut demand: BTreeMap<BeerId, i64> = BTreeMap::new();
        for &(beer_id, amount) in lines {
            if amount <= 0 {
                return Err(LedgerError::InvalidAmount { amount });
            }
            let total = demand.entry(beer_id).or_insert(0);
            *total = total
                .checked_add(amount)
                .ok_or(LedgerError::InvalidAmount { amount })?;
        }
        let Some(&first) = demand.keys().next() else {
            return Ok(Vec::new());
        };

        let mut contended = first;
        for attempt in 1..=self.max_conflict_retries {
            let at = Utc::now();
            let mut commits = Vec::with_capacity(demand.len());
            for (&beer_id, &amount) in &demand {
                let before = self.store.load(beer_id)?;
                let after = before
                    .decrease(amount, &self.classifier, at)
                    .map_err(|e| LedgerError::from_stock(e, amount))?;
                commits.push(Commit { before, after });
            }

            let batch = commits
                .iter()
                .map(|c| (c.after.clone(), ExpectedVersion::Exact(c.before.version())))
                .collect();

            match self.store.save_all(batch) {
                Ok(()) => {
                    return Ok(commits
                        .into_iter()
                        .map(|commit| {
                            let amount = commit.before.quantity() - commit.after.quantity();
                            self.settle(commit, MovementKind::Decrease, amount)
                        })
                        .collect());
                }
                Err(StockStoreError::Conflict { beer_id, .. }) => {
                    debug!(beer_id = %beer_id, attempt, "multi-row stock commit lost a race; retrying");
                    contended = beer_id;
                    thread::yield_now();
                }
                Err(e) => return Err(e.into()),
            }
        }

        let beer_id = contended;
        warn!(beer_id = %beer_id, attempts = self.max_conflict_retries, "multi-row stock commit gave up after repeated conflicts");
        Err(LedgerError::Conflict {
            beer_id,
            attempts: self.max_conflict_retries,
        })
    }

    /// Write off the whole quantity of an expired beer.
    ///
    /// Returns the number of units cleared; zero when the beer is not expired on
    /// `reference_date` or has nothing on hand, in which case nothing is written.
    pub fn clear_if_expired(
        &self,
        beer_id: BeerId,
        reference_date: NaiveDate,
    ) -> Result<i64, LedgerError> {
        let beer = self.catalog.resolve(beer_id)?;
        if !self.expiry.is_expired(&beer, reference_date) {
            return Ok(0);
        }

        let outcome = self.commit_with(beer_id, |current, at| {
            if current.quantity() == 0 {
                return Ok(Change::Skip(()));
            }
            Ok(Change::Write(current.clear(&self.classifier, at)))
        })?;

        match outcome {
            Outcome::Committed(commit) => {
                let cleared = commit.before.quantity();
                self.settle(commit, MovementKind::Clear, cleared);
                Ok(cleared)
            }
            Outcome::Skipped(()) => Ok(0),
        }
    }

    pub fn read(&self, beer_id: BeerId) -> Result<StockRecord, LedgerError> {
        Ok(self.store.load(beer_id)?)
    }

    pub fn list(&self) -> Result<Vec<StockRecord>, LedgerError> {
        Ok(self.store.list()?)
    }

    pub fn list_with_status(&self, status: StockStatus) -> Result<Vec<StockRecord>, LedgerError> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter(|record| record.status() == status)
            .collect())
    }

    /// Drop the stock record of a beer that left the catalog.
    pub fn remove(&self, beer_id: BeerId) -> Result<StockRecord, LedgerError> {
        let removed = self.store.remove(beer_id)?;
        info!(beer_id = %beer_id, quantity = removed.quantity(), "stock record removed");
        Ok(removed)
    }

    /// A mutation that always writes.
    fn commit<F>(&self, beer_id: BeerId, mut apply: F) -> Result<Commit, LedgerError>
    where
        F: FnMut(&StockRecord, DateTime<Utc>) -> Result<StockRecord, LedgerError>,
    {
        let outcome = self.commit_with(beer_id, |current, at| {
            apply(current, at).map(Change::<Infallible>::Write)
        })?;
        match outcome {
            Outcome::Committed(commit) => Ok(commit),
            Outcome::Skipped(never) => match never {},
        }
    }

    /// Load → apply → compare-and-swap, retried on version conflicts.
    ///
    /// `apply` may decide, on the freshly loaded record, that nothing needs writing.
    fn commit_with<K, F>(&self, beer_id: BeerId, mut apply: F) -> Result<Outcome<K>, LedgerError>
    where
        F: FnMut(&StockRecord, DateTime<Utc>) -> Result<Change<K>, LedgerError>,
    {
        for attempt in 1..=self.max_conflict_retries {
            let before = self.store.load(beer_id)?;
            let after = match apply(&before, Utc::now())? {
                Change::Write(after) => after,
                Change::Skip(reason) => return Ok(Outcome::Skipped(reason)),
            };

            match self
                .store
                .save(after.clone(), ExpectedVersion::Exact(before.version()))
            {
                Ok(()) => return Ok(Outcome::Committed(Commit { before, after })),
                Err(StockStoreError::Conflict { actual, .. }) => {
                    debug!(beer_id = %beer_id, attempt, expected = before.version(), actual, "stock record changed underneath; retrying");
                    thread::yield_now();
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(beer_id = %beer_id, attempts = self.max_conflict_retries, "stock mutation gave up after repeated conflicts");
        Err(LedgerError::Conflict {
            beer_id,
            attempts: self.max_conflict_retries,
        })
    }

    /// Log, publish and describe a committed mutation.
    fn settle(&self, commit: Commit, kind: MovementKind, amount: i64) -> StockMovement {
        let Commit { before, after } = commit;
        let beer_id = after.beer_id();

        if before.status() != after.status() {
            info!(
                beer_id = %beer_id,
                from = ?before.status(),
                to = ?after.status(),
                quantity = after.quantity(),
                "stock status changed"
            );
        }

        let occurred_at = after.last_update();
        let event = match kind {
            MovementKind::Decrease => StockEvent::StockDecreased(StockDecreased {
                beer_id,
                amount,
                quantity: after.quantity(),
                status: after.status(),
                occurred_at,
            }),
            MovementKind::Increase => StockEvent::StockIncreased(StockIncreased {
                beer_id,
                amount,
                quantity: after.quantity(),
                status: after.status(),
                occurred_at,
            }),
            MovementKind::Clear => StockEvent::StockCleared(StockCleared {
                beer_id,
                amount,
                occurred_at,
            }),
        };
        self.publish(&after, event);

        StockMovement {
            beer_id,
            kind,
            amount,
            quantity_before: before.quantity(),
            quantity: after.quantity(),
            status: after.status(),
            version: after.version(),
            at: occurred_at,
        }
    }

    /// The mutation is already committed; a failed publish is logged, never surfaced.
    fn publish(&self, record: &StockRecord, event: StockEvent) {
        let envelope = EventEnvelope::wrap(
            record.beer_id().0,
            STOCK_AGGREGATE_TYPE,
            record.version(),
            event,
        );
        if let Err(e) = self.bus.publish(envelope) {
            warn!(beer_id = %record.beer_id(), version = record.version(), error = ?e, "stock event publication failed");
        }
    }
}
