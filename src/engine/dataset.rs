//! The whole in-memory dataset: schema version plus every collection.
//!
//! A dataset is rebuilt by replaying the commit log. Replay goes through the
//! same validated `apply` used to stage exclusive changes, so a log that
//! replays cleanly always satisfies key and unique constraints.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::collection::CollectionState;
use super::errors::{StoreError, StoreResult};
use crate::migration::DatasetShape;
use crate::storage::{Batch, Mutation, StorageError, StorageResult};

pub(crate) fn read_lock<'a, T>(lock: &'a RwLock<T>, what: &str) -> StorageResult<RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|_| StorageError::internal(format!("{} lock poisoned", what)))
}

pub(crate) fn write_lock<'a, T>(lock: &'a RwLock<T>, what: &str) -> StorageResult<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|_| StorageError::internal(format!("{} lock poisoned", what)))
}

pub(crate) fn lock_mutex<'a, T>(lock: &'a Mutex<T>, what: &str) -> StorageResult<MutexGuard<'a, T>> {
    lock.lock()
        .map_err(|_| StorageError::internal(format!("{} lock poisoned", what)))
}

#[derive(Debug, Default)]
pub(crate) struct Dataset {
    version: u32,
    collections: BTreeMap<String, RwLock<CollectionState>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a dataset from committed batches.
    ///
    /// A batch that does not apply cleanly means the log content is
    /// inconsistent and is reported as corruption.
    pub fn replay(batches: &[Batch]) -> StorageResult<Self> {
        let mut dataset = Self::new();
        for batch in batches {
            for mutation in &batch.mutations {
                dataset.apply(mutation).map_err(|e| match e {
                    StoreError::Storage(inner) => inner,
                    other => StorageError::corruption_in_batch(batch.sequence, other.to_string()),
                })?;
            }
        }
        Ok(dataset)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn collection(&self, name: &str) -> StoreResult<&RwLock<CollectionState>> {
        self.collections
            .get(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    pub fn collection_mut(&mut self, name: &str) -> StoreResult<&mut CollectionState> {
        let lock = self
            .collections
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))?;
        lock.get_mut()
            .map_err(|_| StorageError::internal(format!("collection '{}' lock poisoned", name)).into())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Collections and indexes currently present
    pub fn shape(&self) -> StorageResult<DatasetShape> {
        let mut shape = DatasetShape::new(self.version);
        for (name, lock) in &self.collections {
            let state = read_lock(lock, name)?;
            shape = shape.with_collection(state.descriptor().clone());
        }
        Ok(shape)
    }

    /// Deep copy used as the scratch space of an exclusive section.
    pub fn try_clone(&self) -> StorageResult<Self> {
        let mut collections = BTreeMap::new();
        for (name, lock) in &self.collections {
            let state = read_lock(lock, name)?;
            collections.insert(name.clone(), RwLock::new(state.clone()));
        }
        Ok(Self {
            version: self.version,
            collections,
        })
    }

    /// Applies one mutation with full validation.
    pub fn apply(&mut self, mutation: &Mutation) -> StoreResult<()> {
        match mutation {
            Mutation::SetVersion { version } => {
                self.version = *version;
            }
            Mutation::CreateCollection { descriptor } => {
                if self.collections.contains_key(&descriptor.name) {
                    return Err(StorageError::data_corruption(format!(
                        "collection '{}' created twice",
                        descriptor.name
                    ))
                    .into());
                }
                self.collections.insert(
                    descriptor.name.clone(),
                    RwLock::new(CollectionState::new(descriptor.clone())),
                );
            }
            Mutation::CreateIndex { collection, index } => {
                let state = self.collection_mut(collection)?;
                state
                    .add_index(index.clone())
                    .map_err(|value| StoreError::UniqueViolation {
                        collection: collection.clone(),
                        index: index.name.clone(),
                        value: value.to_string(),
                    })?;
            }
            Mutation::Put { collection, record } => {
                self.collection_mut(collection)?.put_checked(record.clone())?;
            }
            Mutation::Delete { collection, key } => {
                let state = self.collection_mut(collection)?;
                let pk = state.lookup_key(key)?;
                state.apply_delete(&pk);
            }
            Mutation::Clear { collection } => {
                self.collection_mut(collection)?.clear();
            }
        }
        Ok(())
    }

    /// Mutations that recreate this dataset from nothing.
    pub fn snapshot_mutations(&self) -> StorageResult<Vec<Mutation>> {
        let mut mutations = vec![Mutation::SetVersion {
            version: self.version,
        }];
        for (name, lock) in &self.collections {
            let state = read_lock(lock, name)?;
            mutations.push(Mutation::CreateCollection {
                descriptor: state.descriptor().clone(),
            });
            mutations.extend(state.records().map(|r| Mutation::put(name, r.clone())));
        }
        Ok(mutations)
    }
}
