//! Schema Catalog for grcstore
//!
//! Declares every collection: its name, primary-key shape, secondary indexes
//! and tenant scope.
//!
//! # Design Principles
//!
//! - Descriptors are immutable once a schema version ships
//! - Only additions are allowed between versions
//! - Malformed declarations fail fast at startup
//! - Deterministic: `describe()` always returns declaration order

mod catalog;
mod types;

pub use catalog::{SchemaCatalog, SchemaCatalogBuilder};
pub use types::{
    CollectionDescriptor, IndexDescriptor, KeyPath, Record, Scope, ID_FIELD, META_COLLECTION,
    META_KEY_FIELD, TENANT_FIELD, TENANT_INDEX,
};
