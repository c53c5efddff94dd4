//! In-memory state of one collection
//!
//! Records keyed by normalized primary key, plus one [`IndexTree`] per
//! declared index. Check methods never mutate; apply methods assume the
//! checks passed and the change is already in the commit log.
//!
//! # API
//!
//! - `primary_key(record)` / `lookup_key(value)` - Key normalization
//! - `check_unique(pk, record)` - Unique index enforcement
//! - `apply_put(pk, record)` / `apply_delete(pk)` - Update records and indexes
//! - `add_index(descriptor)` - Build a new index over existing records
//! - `by_index(name, value)` - Exact-match index lookup

use std::collections::BTreeMap;

use serde_json::Value;
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use crate::index::{IndexKey, IndexTree};
use crate::schema::{CollectionDescriptor, IndexDescriptor, Record, ID_FIELD};

#[derive(Debug, Clone)]
pub(crate) struct CollectionState {
    descriptor: CollectionDescriptor,
    records: BTreeMap<IndexKey, Record>,
    indexes: BTreeMap<String, IndexTree>,
}

impl CollectionState {
    /// Empty collection with every declared index
    pub fn new(descriptor: CollectionDescriptor) -> Self {
        let indexes = descriptor
            .indexes
            .iter()
            .map(|ix| (ix.name.clone(), IndexTree::new()))
            .collect();
        Self {
            descriptor,
            records: BTreeMap::new(),
            indexes,
        }
    }

    pub fn descriptor(&self) -> &CollectionDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Primary key of `record` under the declared key shape.
    pub fn primary_key(&self, record: &Record) -> StoreResult<IndexKey> {
        IndexKey::extract(&self.descriptor.primary_key, record).ok_or_else(|| {
            StoreError::key_mismatch(
                self.name(),
                format!(
                    "record must carry scalar value(s) for key {}",
                    self.descriptor.primary_key
                ),
            )
        })
    }

    /// Primary key from a caller-supplied lookup value.
    pub fn lookup_key(&self, value: &Value) -> StoreResult<IndexKey> {
        IndexKey::from_lookup(&self.descriptor.primary_key, value).ok_or_else(|| {
            StoreError::key_mismatch(
                self.name(),
                format!(
                    "lookup value {} does not match key {}",
                    value, self.descriptor.primary_key
                ),
            )
        })
    }

    /// Fills in a fresh UUID v4 `id` when the collection is keyed by `id`
    /// and the record has none.
    pub fn assign_id(&self, record: &mut Record) {
        if !self.descriptor.primary_key.is_generated_id() {
            return;
        }
        if !record.get(ID_FIELD).map_or(true, Value::is_null) {
            return;
        }
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.contains(&IndexKey::String(id.clone())) {
                record.insert(ID_FIELD.to_string(), Value::String(id));
                return;
            }
        }
    }

    pub fn contains(&self, pk: &IndexKey) -> bool {
        self.records.contains_key(pk)
    }

    pub fn get(&self, pk: &IndexKey) -> Option<&Record> {
        self.records.get(pk)
    }

    /// Records in primary-key order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Fails if writing `record` under `pk` would give a unique index value
    /// a second holder.
    pub fn check_unique(&self, pk: &IndexKey, record: &Record) -> StoreResult<()> {
        for index in self.descriptor.indexes.iter().filter(|ix| ix.unique) {
            let Some(value) = IndexKey::extract(&index.key, record) else {
                continue;
            };
            let Some(tree) = self.indexes.get(&index.name) else {
                continue;
            };
            if tree.other_holder(&value, pk).is_some() {
                return Err(StoreError::UniqueViolation {
                    collection: self.name().to_string(),
                    index: index.name.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Key extraction, unique check and apply in one step.
    pub fn put_checked(&mut self, record: Record) -> StoreResult<IndexKey> {
        let pk = self.primary_key(&record)?;
        self.check_unique(&pk, &record)?;
        self.apply_put(pk.clone(), record);
        Ok(pk)
    }

    /// Full replace of the record under `pk`.
    pub fn apply_put(&mut self, pk: IndexKey, record: Record) {
        if let Some(old) = self.records.remove(&pk) {
            self.unindex(&pk, &old);
        }
        self.index(&pk, &record);
        self.records.insert(pk, record);
    }

    /// Removes the record under `pk`, if any.
    pub fn apply_delete(&mut self, pk: &IndexKey) -> Option<Record> {
        let old = self.records.remove(pk)?;
        self.unindex(pk, &old);
        Some(old)
    }

    pub fn clear(&mut self) {
        self.records.clear();
        for tree in self.indexes.values_mut() {
            tree.clear();
        }
    }

    /// Declares and builds a new index over the existing records.
    ///
    /// On a unique conflict nothing changes and the duplicated value is
    /// returned.
    pub fn add_index(&mut self, index: IndexDescriptor) -> Result<(), IndexKey> {
        let mut tree = IndexTree::new();
        for (pk, record) in &self.records {
            if let Some(value) = IndexKey::extract(&index.key, record) {
                if index.unique && tree.other_holder(&value, pk).is_some() {
                    return Err(value);
                }
                tree.insert(value, pk.clone());
            }
        }

        self.indexes.insert(index.name.clone(), tree);
        self.descriptor.indexes.retain(|ix| ix.name != index.name);
        self.descriptor.indexes.push(index);
        Ok(())
    }

    /// Records whose `index` value equals `value`, in primary-key order.
    pub fn by_index(&self, index: &str, value: &Value) -> StoreResult<Vec<Record>> {
        let descriptor = self
            .descriptor
            .index(index)
            .ok_or_else(|| StoreError::UnknownIndex {
                collection: self.name().to_string(),
                index: index.to_string(),
            })?;
        let tree = self
            .indexes
            .get(index)
            .ok_or_else(|| StoreError::UnknownIndex {
                collection: self.name().to_string(),
                index: index.to_string(),
            })?;

        let Some(key) = IndexKey::from_lookup(&descriptor.key, value) else {
            return Ok(Vec::new());
        };

        Ok(tree
            .lookup_eq(&key)
            .iter()
            .filter_map(|pk| self.records.get(pk).cloned())
            .collect())
    }

    fn index(&mut self, pk: &IndexKey, record: &Record) {
        for ix in &self.descriptor.indexes {
            if let (Some(value), Some(tree)) = (
                IndexKey::extract(&ix.key, record),
                self.indexes.get_mut(&ix.name),
            ) {
                tree.insert(value, pk.clone());
            }
        }
    }

    fn unindex(&mut self, pk: &IndexKey, record: &Record) {
        for ix in &self.descriptor.indexes {
            if let (Some(value), Some(tree)) = (
                IndexKey::extract(&ix.key, record),
                self.indexes.get_mut(&ix.name),
            ) {
                tree.remove(&value, pk);
            }
        }
    }
}
