use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use brewery_catalog::BeerId;
use brewery_core::ExpectedVersion;
use brewery_inventory::StockRecord;

use super::r#trait::{StockStore, StockStoreError};

/// In-memory stock store.
///
/// Intended for tests/dev and single-process deployments. All writes go through
/// one `RwLock`, which makes `save_all` trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    rows: RwLock<BTreeMap<BeerId, StockRecord>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StockStoreError {
        StockStoreError::Unavailable("lock poisoned".to_string())
    }

    fn check(
        rows: &BTreeMap<BeerId, StockRecord>,
        record: &StockRecord,
        expected_version: ExpectedVersion,
    ) -> Result<(), StockStoreError> {
        let beer_id = record.beer_id();
        let current = rows.get(&beer_id).ok_or(StockStoreError::NotFound(beer_id))?;

        if !expected_version.matches(current.version()) {
            return Err(StockStoreError::Conflict {
                beer_id,
                expected: expected_version,
                actual: current.version(),
            });
        }
        Ok(())
    }
}

impl StockStore for InMemoryStockStore {
    fn load(&self, beer_id: BeerId) -> Result<StockRecord, StockStoreError> {
        let rows = self.rows.read().map_err(|_| Self::poisoned())?;
        rows.get(&beer_id)
            .cloned()
            .ok_or(StockStoreError::NotFound(beer_id))
    }

    fn list(&self) -> Result<Vec<StockRecord>, StockStoreError> {
        let rows = self.rows.read().map_err(|_| Self::poisoned())?;
        Ok(rows.values().cloned().collect())
    }

    fn insert(&self, record: StockRecord) -> Result<(), StockStoreError> {
        let mut rows = self.rows.write().map_err(|_| Self::poisoned())?;

        let beer_id = record.beer_id();
        if rows.contains_key(&beer_id) {
            return Err(StockStoreError::AlreadyExists(beer_id));
        }
        rows.insert(beer_id, record);
        Ok(())
    }

    fn save(
        &self,
        record: StockRecord,
        expected_version: ExpectedVersion,
    ) -> Result<(), StockStoreError> {
        let mut rows = self.rows.write().map_err(|_| Self::poisoned())?;

        Self::check(&rows, &record, expected_version)?;
        rows.insert(record.beer_id(), record);
        Ok(())
    }

    fn save_all(
        &self,
        batch: Vec<(StockRecord, ExpectedVersion)>,
    ) -> Result<(), StockStoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut rows = self.rows.write().map_err(|_| Self::poisoned())?;

        // Validate the whole batch before touching any row.
        let mut seen = BTreeSet::new();
        for (record, expected_version) in &batch {
            if !seen.insert(record.beer_id()) {
                return Err(StockStoreError::DuplicateInBatch(record.beer_id()));
            }
            Self::check(&rows, record, *expected_version)?;
        }

        for (record, _) in batch {
            rows.insert(record.beer_id(), record);
        }
        Ok(())
    }

    fn remove(&self, beer_id: BeerId) -> Result<StockRecord, StockStoreError> {
        let mut rows = self.rows.write().map_err(|_| Self::poisoned())?;
        rows.remove(&beer_id).ok_or(StockStoreError::NotFound(beer_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewery_core::EntityId;
    use brewery_inventory::StatusClassifier;
    use chrono::Utc;

    fn test_beer_id() -> BeerId {
        BeerId::new(EntityId::new())
    }

    fn opened(beer_id: BeerId, quantity: i64) -> StockRecord {
        StockRecord::open(beer_id, quantity, &StatusClassifier::default(), Utc::now()).unwrap()
    }

    #[test]
    fn insert_then_load_round_trips() {
        let store = InMemoryStockStore::new();
        let beer_id = test_beer_id();
        store.insert(opened(beer_id, 12)).unwrap();

        let loaded = store.load(beer_id).unwrap();
        assert_eq!(loaded.quantity(), 12);
        assert_eq!(loaded.version(), 1);

        assert_eq!(
            store.insert(opened(beer_id, 3)).unwrap_err(),
            StockStoreError::AlreadyExists(beer_id)
        );
    }

    #[test]
    fn save_with_stale_version_is_a_conflict() {
        let store = InMemoryStockStore::new();
        let classifier = StatusClassifier::default();
        let beer_id = test_beer_id();
        let original = opened(beer_id, 20);
        store.insert(original.clone()).unwrap();

        let first = original.decrease(5, &classifier, Utc::now()).unwrap();
        store.save(first, ExpectedVersion::Exact(1)).unwrap();

        // A second writer that also read version 1 loses.
        let second = original.decrease(8, &classifier, Utc::now()).unwrap();
        match store.save(second, ExpectedVersion::Exact(1)) {
            Err(StockStoreError::Conflict { actual, .. }) => assert_eq!(actual, 2),
            other => panic!("expected conflict, got {other:?}"),
        }

        assert_eq!(store.load(beer_id).unwrap().quantity(), 15);
    }

    #[test]
    fn save_all_is_all_or_nothing() {
        let store = InMemoryStockStore::new();
        let classifier = StatusClassifier::default();
        let a = opened(test_beer_id(), 10);
        let b = opened(test_beer_id(), 10);
        store.insert(a.clone()).unwrap();
        store.insert(b.clone()).unwrap();

        let a_next = a.decrease(4, &classifier, Utc::now()).unwrap();
        let b_next = b.decrease(4, &classifier, Utc::now()).unwrap();

        // b's expected version is stale: nothing may be written.
        let err = store
            .save_all(vec![
                (a_next.clone(), ExpectedVersion::Exact(1)),
                (b_next.clone(), ExpectedVersion::Exact(7)),
            ])
            .unwrap_err();
        assert!(matches!(err, StockStoreError::Conflict { .. }));
        assert_eq!(store.load(a.beer_id()).unwrap().quantity(), 10);

        store
            .save_all(vec![
                (a_next, ExpectedVersion::Exact(1)),
                (b_next, ExpectedVersion::Exact(1)),
            ])
            .unwrap();
        assert_eq!(store.load(a.beer_id()).unwrap().quantity(), 6);
        assert_eq!(store.load(b.beer_id()).unwrap().quantity(), 6);
    }

    #[test]
    fn save_all_rejects_a_beer_named_twice() {
        let store = InMemoryStockStore::new();
        let classifier = StatusClassifier::default();
        let a = opened(test_beer_id(), 10);
        store.insert(a.clone()).unwrap();

        let once = a.decrease(2, &classifier, Utc::now()).unwrap();
        let twice = a.decrease(3, &classifier, Utc::now()).unwrap();

        assert_eq!(
            store
                .save_all(vec![
                    (once, ExpectedVersion::Exact(1)),
                    (twice, ExpectedVersion::Exact(1)),
                ])
                .unwrap_err(),
            StockStoreError::DuplicateInBatch(a.beer_id())
        );
        let stored = store.load(a.beer_id()).unwrap();
        assert_eq!((stored.quantity(), stored.version()), (10, 1));
    }

    #[test]
    fn remove_and_missing_rows() {
        let store = InMemoryStockStore::new();
        let beer_id = test_beer_id();
        store.insert(opened(beer_id, 1)).unwrap();

        assert_eq!(store.remove(beer_id).unwrap().beer_id(), beer_id);
        assert_eq!(
            store.load(beer_id).unwrap_err(),
            StockStoreError::NotFound(beer_id)
        );
        assert_eq!(
            store.save(opened(beer_id, 1), ExpectedVersion::Any).unwrap_err(),
            StockStoreError::NotFound(beer_id)
        );
    }
}
