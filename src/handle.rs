//! Async handle over the blocking store
//!
//! Every call runs on tokio's blocking pool, so a caller awaiting a write
//! that waits on a collection lock or an fsync suspends instead of stalling
//! the executor.

use std::sync::Arc;

use serde_json::Value;

use crate::config::StoreConfig;
use crate::engine::{Store, StoreResult};
use crate::schema::{Record, SchemaCatalog};
use crate::seed::{Baseline, SeedOutcome, SeedState};
use crate::storage::StorageError;

/// Cloneable async facade; clones share one [`Store`].
#[derive(Clone)]
pub struct AsyncStore {
    inner: Arc<Store>,
}

impl AsyncStore {
    pub fn new(store: Store) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Opens (replay, migrate) on the blocking pool.
    pub async fn open(config: StoreConfig, catalog: SchemaCatalog) -> StoreResult<Self> {
        let store = tokio::task::spawn_blocking(move || Store::open(config, catalog))
            .await
            .map_err(|e| StorageError::internal(format!("open task failed: {}", e)))??;
        Ok(Self::new(store))
    }

    /// The shared blocking store
    pub fn blocking(&self) -> &Store {
        &self.inner
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Store) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StorageError::internal(format!("store task failed: {}", e)))?
    }

    pub async fn get(&self, collection: &str, key: Value) -> StoreResult<Option<Record>> {
        let collection = collection.to_string();
        self.run(move |s| s.get(&collection, &key)).await
    }

    pub async fn get_all(&self, collection: &str) -> StoreResult<Vec<Record>> {
        let collection = collection.to_string();
        self.run(move |s| s.get_all(&collection)).await
    }

    pub async fn get_by_index(
        &self,
        collection: &str,
        index: &str,
        value: Value,
    ) -> StoreResult<Vec<Record>> {
        let collection = collection.to_string();
        let index = index.to_string();
        self.run(move |s| s.get_by_index(&collection, &index, &value))
            .await
    }

    pub async fn get_all_for_tenant(
        &self,
        collection: &str,
        tenant_id: &str,
    ) -> StoreResult<Vec<Record>> {
        let collection = collection.to_string();
        let tenant_id = tenant_id.to_string();
        self.run(move |s| s.get_all_for_tenant(&collection, &tenant_id))
            .await
    }

    pub async fn count(&self, collection: &str) -> StoreResult<usize> {
        let collection = collection.to_string();
        self.run(move |s| s.count(&collection)).await
    }

    pub async fn put(&self, collection: &str, record: Record) -> StoreResult<()> {
        let collection = collection.to_string();
        self.run(move |s| s.put(&collection, record)).await
    }

    pub async fn add(&self, collection: &str, record: Record) -> StoreResult<Record> {
        let collection = collection.to_string();
        self.run(move |s| s.add(&collection, record)).await
    }

    pub async fn delete(&self, collection: &str, key: Value) -> StoreResult<()> {
        let collection = collection.to_string();
        self.run(move |s| s.delete(&collection, &key)).await
    }

    pub async fn clear(&self, collection: &str) -> StoreResult<()> {
        let collection = collection.to_string();
        self.run(move |s| s.clear(&collection)).await
    }

    pub async fn bulk_put(&self, collection: &str, records: Vec<Record>) -> StoreResult<()> {
        let collection = collection.to_string();
        self.run(move |s| s.bulk_put(&collection, records)).await
    }

    pub async fn seed_state(&self) -> StoreResult<SeedState> {
        self.run(|s| s.seed_state()).await
    }

    pub async fn ensure_seeded(&self, baseline: Baseline) -> StoreResult<SeedOutcome> {
        self.run(move |s| s.ensure_seeded(&baseline)).await
    }

    pub async fn reset(&self, baseline: Baseline) -> StoreResult<SeedOutcome> {
        self.run(move |s| s.reset(&baseline)).await
    }

    pub async fn compact(&self) -> StoreResult<()> {
        self.run(|s| s.compact()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CollectionDescriptor, KeyPath};
    use serde_json::json;

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::builder()
            .collection(CollectionDescriptor::global("assets", KeyPath::single("id")))
            .build()
    }

    #[tokio::test]
    async fn test_roundtrip_through_blocking_pool() {
        let store = AsyncStore::open(StoreConfig::in_memory("async"), catalog())
            .await
            .unwrap();

        let added = store
            .add("assets", json!({"name": "laptop"}).as_object().cloned().unwrap())
            .await
            .unwrap();
        let fetched = store.get("assets", added["id"].clone()).await.unwrap();
        assert_eq!(fetched, Some(added));
        assert_eq!(store.count("assets").await.unwrap(), 1);
        assert_eq!(store.blocking().count("assets").unwrap(), 1);
    }
}
