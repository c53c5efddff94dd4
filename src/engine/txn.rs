//! Exclusive section over the whole dataset
//!
//! An `ExclusiveTxn` works on a scratch copy of the dataset. Every change is
//! validated against the scratch copy and staged as a mutation. When the
//! closure passed to `Store::exclusive` succeeds, the staged mutations are
//! committed as one batch and the scratch copy replaces the live dataset.
//! When it fails, or the commit fails, the scratch copy is dropped.

use serde_json::Value;

use super::dataset::Dataset;
use super::errors::{StoreError, StoreResult};
use crate::migration::{DatasetShape, MigrationError, MigrationPlan, MigrationResult, MigrationTarget};
use crate::schema::{Record, SchemaCatalog};
use crate::storage::Mutation;

/// Staged, all-or-nothing changes across collections.
pub struct ExclusiveTxn<'s> {
    catalog: &'s SchemaCatalog,
    scratch: Dataset,
    staged: Vec<Mutation>,
}

impl<'s> ExclusiveTxn<'s> {
    pub(crate) fn new(catalog: &'s SchemaCatalog, scratch: Dataset) -> Self {
        Self {
            catalog,
            scratch,
            staged: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> (Dataset, Vec<Mutation>) {
        (self.scratch, self.staged)
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        self.catalog
    }

    /// Schema version as of the staged changes
    pub fn version(&self) -> u32 {
        self.scratch.version()
    }

    /// Number of staged mutations
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    pub fn get(&mut self, collection: &str, key: &Value) -> StoreResult<Option<Record>> {
        let state = self.scratch.collection_mut(collection)?;
        let pk = state.lookup_key(key)?;
        Ok(state.get(&pk).cloned())
    }

    pub fn count(&mut self, collection: &str) -> StoreResult<usize> {
        Ok(self.scratch.collection_mut(collection)?.count())
    }

    /// Upsert, validated against the staged state.
    pub fn put(&mut self, collection: &str, record: Record) -> StoreResult<()> {
        self.stage(Mutation::put(collection, record))
    }

    /// Insert-only; generates an `id` where the key shape allows it.
    pub fn add(&mut self, collection: &str, mut record: Record) -> StoreResult<Record> {
        let state = self.scratch.collection_mut(collection)?;
        state.assign_id(&mut record);
        let pk = state.primary_key(&record)?;
        if state.contains(&pk) {
            return Err(StoreError::DuplicateKey {
                collection: collection.to_string(),
                key: pk.to_string(),
            });
        }
        self.stage(Mutation::put(collection, record.clone()))?;
        Ok(record)
    }

    pub fn delete(&mut self, collection: &str, key: Value) -> StoreResult<()> {
        self.stage(Mutation::delete(collection, key))
    }

    pub fn clear(&mut self, collection: &str) -> StoreResult<()> {
        self.stage(Mutation::clear(collection))
    }

    fn stage(&mut self, mutation: Mutation) -> StoreResult<()> {
        self.scratch.apply(&mutation)?;
        self.staged.push(mutation);
        Ok(())
    }
}

fn to_migration_error(collection: &str, err: StoreError) -> MigrationError {
    match err {
        StoreError::Storage(e) => MigrationError::Io(e),
        StoreError::Migration(e) => e,
        other => MigrationError::shape_conflict(collection, other.to_string()),
    }
}

impl MigrationTarget for ExclusiveTxn<'_> {
    fn shape(&self) -> MigrationResult<DatasetShape> {
        Ok(self.scratch.shape()?)
    }

    fn apply(&mut self, plan: &MigrationPlan) -> MigrationResult<()> {
        for descriptor in &plan.create_collections {
            self.stage(Mutation::CreateCollection {
                descriptor: descriptor.clone(),
            })
            .map_err(|e| to_migration_error(&descriptor.name, e))?;
        }

        for (collection, index) in &plan.add_indexes {
            let state = self
                .scratch
                .collection_mut(collection)
                .map_err(|e| to_migration_error(collection, e))?;
            state
                .add_index(index.clone())
                .map_err(|value| MigrationError::IndexBuild {
                    collection: collection.clone(),
                    index: index.name.clone(),
                    reason: format!("duplicate value {} in existing records", value),
                })?;
            self.staged.push(Mutation::CreateIndex {
                collection: collection.clone(),
                index: index.clone(),
            });
        }

        if plan.bumps_version() {
            self.stage(Mutation::SetVersion {
                version: plan.to_version,
            })
            .map_err(|e| to_migration_error("", e))?;
        }
        Ok(())
    }
}
