//! Schema catalog: the static set of collections a dataset must have.
//!
//! The catalog is an explicit value handed to the store, built once at
//! startup. Malformed declarations are programmer errors and panic during
//! `build()`, never at request time.

use std::collections::{HashMap, HashSet};

use super::types::{
    CollectionDescriptor, IndexDescriptor, KeyPath, Scope, META_COLLECTION, META_KEY_FIELD,
    TENANT_FIELD, TENANT_INDEX,
};

/// Ordered, validated set of collection descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaCatalog {
    collections: Vec<CollectionDescriptor>,
    positions: HashMap<String, usize>,
}

impl SchemaCatalog {
    pub fn builder() -> SchemaCatalogBuilder {
        SchemaCatalogBuilder::default()
    }

    /// Every collection, in declaration order. The reserved metadata
    /// collection comes last.
    pub fn describe(&self) -> &[CollectionDescriptor] {
        &self.collections
    }

    pub fn get(&self, name: &str) -> Option<&CollectionDescriptor> {
        self.positions.get(name).map(|&i| &self.collections[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn scope_of(&self, name: &str) -> Option<Scope> {
        self.get(name).map(|c| c.scope)
    }

    /// Names of tenant-scoped collections
    pub fn tenant_scoped(&self) -> impl Iterator<Item = &str> {
        self.collections
            .iter()
            .filter(|c| c.scope == Scope::Tenant)
            .map(|c| c.name.as_str())
    }

    /// Names of global collections, including the metadata collection
    pub fn global(&self) -> impl Iterator<Item = &str> {
        self.collections
            .iter()
            .filter(|c| c.scope == Scope::Global)
            .map(|c| c.name.as_str())
    }

    /// Collections whose contents the seed controller owns: everything but
    /// the metadata collection
    pub fn managed(&self) -> impl Iterator<Item = &str> {
        self.collections
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| *name != META_COLLECTION)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

/// Builder for [`SchemaCatalog`]
#[derive(Debug, Default)]
pub struct SchemaCatalogBuilder {
    collections: Vec<CollectionDescriptor>,
}

impl SchemaCatalogBuilder {
    pub fn collection(mut self, descriptor: CollectionDescriptor) -> Self {
        self.collections.push(descriptor);
        self
    }

    /// Validates every declaration and appends the metadata collection.
    ///
    /// # Panics
    ///
    /// - duplicate collection names, or a collection named `_meta`
    /// - duplicate index names within a collection
    /// - an empty primary key or an index with no key fields
    /// - a tenant-scoped collection whose `tenant_id` index has another shape
    pub fn build(self) -> SchemaCatalog {
        let mut collections = Vec::with_capacity(self.collections.len() + 1);
        let mut positions = HashMap::new();

        for mut descriptor in self.collections {
            if descriptor.name == META_COLLECTION {
                panic!("collection name '{}' is reserved", META_COLLECTION);
            }
            validate_descriptor(&descriptor);

            if descriptor.scope == Scope::Tenant {
                ensure_tenant_index(&mut descriptor);
            }

            if positions
                .insert(descriptor.name.clone(), collections.len())
                .is_some()
            {
                panic!("collection '{}' declared twice", descriptor.name);
            }
            collections.push(descriptor);
        }

        positions.insert(META_COLLECTION.to_string(), collections.len());
        collections.push(CollectionDescriptor::global(
            META_COLLECTION,
            KeyPath::single(META_KEY_FIELD),
        ));

        SchemaCatalog {
            collections,
            positions,
        }
    }
}

fn validate_descriptor(descriptor: &CollectionDescriptor) {
    if descriptor.name.is_empty() {
        panic!("collection name must not be empty");
    }
    if descriptor.primary_key.fields().is_empty() {
        panic!("collection '{}' has an empty primary key", descriptor.name);
    }

    let mut seen = HashSet::new();
    for index in &descriptor.indexes {
        if !seen.insert(index.name.as_str()) {
            panic!(
                "collection '{}' declares index '{}' twice",
                descriptor.name, index.name
            );
        }
        if index.key.fields().is_empty() {
            panic!(
                "index '{}' on collection '{}' has no key fields",
                index.name, descriptor.name
            );
        }
    }
}

fn ensure_tenant_index(descriptor: &mut CollectionDescriptor) {
    let expected = IndexDescriptor::named(TENANT_INDEX, KeyPath::single(TENANT_FIELD));
    match descriptor.index(TENANT_INDEX) {
        Some(existing) if *existing == expected => {}
        Some(existing) => panic!(
            "tenant-scoped collection '{}' declares index '{}' over {} (unique: {}); expected non-unique over {}",
            descriptor.name, TENANT_INDEX, existing.key, existing.unique, TENANT_FIELD
        ),
        None => descriptor.indexes.push(expected),
    }
}
