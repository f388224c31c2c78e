//! Keyed storage for insert-mostly audit and order records.
//!
//! Orders, loss records and restock records never contend the way stock rows
//! do, so they live in a plain keyed store without version checks.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use brewery_core::Entity;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordStoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    AlreadyExists,

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Key/value store abstraction for records that carry their own identity.
pub trait RecordStore<K, V>: Send + Sync
where
    V: Entity<Id = K>,
{
    fn get(&self, key: &K) -> Result<Option<V>, RecordStoreError>;

    /// Fails with `AlreadyExists` if a record with the same id is stored.
    fn insert(&self, value: V) -> Result<(), RecordStoreError>;

    /// Replace an existing record. Fails with `NotFound` if it is missing.
    fn update(&self, value: V) -> Result<(), RecordStoreError>;

    fn remove(&self, key: &K) -> Result<V, RecordStoreError>;

    /// All records, ordered by key.
    fn list(&self) -> Result<Vec<V>, RecordStoreError>;
}

impl<K, V, S> RecordStore<K, V> for Arc<S>
where
    V: Entity<Id = K>,
    S: RecordStore<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Result<Option<V>, RecordStoreError> {
        (**self).get(key)
    }

    fn insert(&self, value: V) -> Result<(), RecordStoreError> {
        (**self).insert(value)
    }

    fn update(&self, value: V) -> Result<(), RecordStoreError> {
        (**self).update(value)
    }

    fn remove(&self, key: &K) -> Result<V, RecordStoreError> {
        (**self).remove(key)
    }

    fn list(&self) -> Result<Vec<V>, RecordStoreError> {
        (**self).list()
    }
}

/// In-memory record store for tests/dev.
#[derive(Debug)]
pub struct InMemoryRecordStore<K, V> {
    inner: RwLock<BTreeMap<K, V>>,
}

impl<K, V> InMemoryRecordStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryRecordStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> RecordStoreError {
    RecordStoreError::Unavailable("lock poisoned".to_string())
}

impl<K, V> RecordStore<K, V> for InMemoryRecordStore<K, V>
where
    K: Clone + Ord + Send + Sync + 'static,
    V: Entity<Id = K> + Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Result<Option<V>, RecordStoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(key).cloned())
    }

    fn insert(&self, value: V) -> Result<(), RecordStoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let key = value.id().clone();
        if map.contains_key(&key) {
            return Err(RecordStoreError::AlreadyExists);
        }
        map.insert(key, value);
        Ok(())
    }

    fn update(&self, value: V) -> Result<(), RecordStoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        match map.get_mut(value.id()) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RecordStoreError::NotFound),
        }
    }

    fn remove(&self, key: &K) -> Result<V, RecordStoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(key).ok_or(RecordStoreError::NotFound)
    }

    fn list(&self) -> Result<Vec<V>, RecordStoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewery_catalog::BeerId;
    use brewery_core::EntityId;
    use brewery_inventory::{RestockId, RestockRecord};
    use chrono::Utc;

    fn test_restock(quantity: i64) -> RestockRecord {
        RestockRecord::new(
            RestockId::new(EntityId::new()),
            BeerId::new(EntityId::new()),
            quantity,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn insert_get_update_remove() {
        let store: InMemoryRecordStore<RestockId, RestockRecord> = InMemoryRecordStore::new();
        let record = test_restock(10);
        let id = record.id_typed();

        store.insert(record.clone()).unwrap();
        assert_eq!(store.insert(record.clone()), Err(RecordStoreError::AlreadyExists));
        assert_eq!(store.get(&id).unwrap(), Some(record.clone()));

        store.update(record.with_quantity(25).unwrap()).unwrap();
        assert_eq!(store.get(&id).unwrap().unwrap().quantity(), 25);

        assert_eq!(store.remove(&id).unwrap().quantity(), 25);
        assert_eq!(store.get(&id).unwrap(), None);
        assert_eq!(store.remove(&id), Err(RecordStoreError::NotFound));
    }

    #[test]
    fn update_of_missing_record_fails() {
        let store: InMemoryRecordStore<RestockId, RestockRecord> = InMemoryRecordStore::new();
        assert_eq!(store.update(test_restock(1)), Err(RecordStoreError::NotFound));
        assert!(store.list().unwrap().is_empty());
    }
}
