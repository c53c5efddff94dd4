//! Migration planning: the diff between on-disk and declared shape.
//!
//! Planning is pure. It never writes, and the same inputs always produce the
//! same plan, in catalog declaration order.

use std::collections::BTreeMap;

use super::errors::{MigrationError, MigrationResult};
use crate::schema::{CollectionDescriptor, IndexDescriptor, SchemaCatalog};

/// Collections and indexes that exist in a dataset, plus its version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetShape {
    pub version: u32,
    pub collections: BTreeMap<String, CollectionDescriptor>,
}

impl DatasetShape {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            collections: BTreeMap::new(),
        }
    }

    pub fn with_collection(mut self, descriptor: CollectionDescriptor) -> Self {
        self.collections.insert(descriptor.name.clone(), descriptor);
        self
    }
}

/// Additive changes needed to reach the declared shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    pub from_version: u32,
    pub to_version: u32,
    /// Missing collections, each with all of its indexes
    pub create_collections: Vec<CollectionDescriptor>,
    /// Missing indexes on existing collections: (collection, index)
    pub add_indexes: Vec<(String, IndexDescriptor)>,
}

impl MigrationPlan {
    /// No collections or indexes to create
    pub fn is_empty(&self) -> bool {
        self.create_collections.is_empty() && self.add_indexes.is_empty()
    }

    pub fn bumps_version(&self) -> bool {
        self.to_version != self.from_version
    }

    /// Nothing to write at all
    pub fn is_noop(&self) -> bool {
        self.is_empty() && !self.bumps_version()
    }
}

/// Computes the plan that takes `shape` to `catalog` at `target_version`.
///
/// # Errors
///
/// - `UnsupportedDowngrade` if `target_version` is below the on-disk version
///   or the dataset holds a collection or index the catalog no longer declares
/// - `ShapeConflict` if an existing definition differs from its declaration
pub fn plan(
    shape: &DatasetShape,
    target_version: u32,
    catalog: &SchemaCatalog,
) -> MigrationResult<MigrationPlan> {
    if target_version < shape.version {
        return Err(MigrationError::downgrade(format!(
            "on-disk version {} is newer than target {}",
            shape.version, target_version
        )));
    }

    for name in shape.collections.keys() {
        if !catalog.contains(name) {
            return Err(MigrationError::downgrade(format!(
                "collection '{}' exists on disk but is no longer declared",
                name
            )));
        }
    }

    let mut result = MigrationPlan {
        from_version: shape.version,
        to_version: target_version,
        ..MigrationPlan::default()
    };

    for declared in catalog.describe() {
        let existing = match shape.collections.get(&declared.name) {
            Some(existing) => existing,
            None => {
                result.create_collections.push(declared.clone());
                continue;
            }
        };

        if existing.primary_key != declared.primary_key {
            return Err(MigrationError::shape_conflict(
                &declared.name,
                format!(
                    "primary key changed from {} to {}",
                    existing.primary_key, declared.primary_key
                ),
            ));
        }
        if existing.scope != declared.scope {
            return Err(MigrationError::shape_conflict(
                &declared.name,
                format!(
                    "scope changed from {} to {}",
                    existing.scope.as_str(),
                    declared.scope.as_str()
                ),
            ));
        }

        for index in &existing.indexes {
            match declared.index(&index.name) {
                None => {
                    return Err(MigrationError::downgrade(format!(
                        "index '{}' on '{}' is no longer declared",
                        index.name, declared.name
                    )))
                }
                Some(wanted) if wanted != index => {
                    return Err(MigrationError::shape_conflict(
                        &declared.name,
                        format!("index '{}' definition changed", index.name),
                    ))
                }
                Some(_) => {}
            }
        }

        for index in &declared.indexes {
            if existing.index(&index.name).is_none() {
                result
                    .add_indexes
                    .push((declared.name.clone(), index.clone()));
            }
        }
    }

    Ok(result)
}
