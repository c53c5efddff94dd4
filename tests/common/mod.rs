//! Shared fixtures for integration tests

#![allow(dead_code)]

use grcstore::{
    Baseline, CollectionDescriptor, IndexDescriptor, KeyPath, MemoryBackend, Record,
    SchemaCatalog, Store, StoreConfig,
};
use serde_json::Value;
use tempfile::TempDir;

/// Current schema version of [`catalog`]
pub const CURRENT_VERSION: u32 = 4;

pub fn record(value: Value) -> Record {
    value
        .as_object()
        .cloned()
        .expect("fixture records are JSON objects")
}

/// Collections as they were at version 1
pub fn catalog_v1() -> SchemaCatalog {
    SchemaCatalog::builder()
        .collection(CollectionDescriptor::global("tenants", KeyPath::single("id")))
        .collection(CollectionDescriptor::global("frameworks", KeyPath::single("id")))
        .collection(CollectionDescriptor::tenant("widgets", KeyPath::single("id")))
        .build()
}

/// Full catalog: unique indexes, a composite key and collections added
/// after version 1
pub fn catalog() -> SchemaCatalog {
    SchemaCatalog::builder()
        .collection(CollectionDescriptor::global("tenants", KeyPath::single("id")))
        .collection(
            CollectionDescriptor::global("frameworks", KeyPath::single("id"))
                .with_index(IndexDescriptor::on("code").unique()),
        )
        .collection(
            CollectionDescriptor::global("users", KeyPath::single("id"))
                .with_index(IndexDescriptor::on("email").unique())
                .with_index(IndexDescriptor::on("role")),
        )
        .collection(
            CollectionDescriptor::tenant("widgets", KeyPath::single("id"))
                .with_index(IndexDescriptor::on("status")),
        )
        .collection(
            CollectionDescriptor::tenant(
                "control_mappings",
                KeyPath::composite(["framework_id", "control_id"]),
            )
            .with_index(IndexDescriptor::on("framework_id")),
        )
        .collection(CollectionDescriptor::global("assets", KeyPath::single("id")))
        .build()
}

pub fn baseline() -> Baseline {
    Baseline::new()
        .collection(
            "tenants",
            vec![
                record(serde_json::json!({"id": "A", "name": "Acme"})),
                record(serde_json::json!({"id": "B", "name": "Bolt"})),
            ],
        )
        .collection(
            "frameworks",
            vec![
                record(serde_json::json!({"code": "ISO27001", "name": "ISO/IEC 27001"})),
                record(serde_json::json!({"code": "SOC2", "name": "SOC 2"})),
                record(serde_json::json!({"code": "NIST", "name": "NIST CSF"})),
            ],
        )
        .collection(
            "users",
            vec![record(
                serde_json::json!({"id": "u1", "email": "admin@acme.test", "role": "admin"}),
            )],
        )
}

pub fn memory_config() -> StoreConfig {
    StoreConfig::in_memory("grc").with_schema_version(CURRENT_VERSION)
}

/// Opens the full catalog at the current version over a shared memory log
pub fn open_memory(backend: &MemoryBackend) -> Store {
    Store::open_with_backend(memory_config(), catalog(), Box::new(backend.clone()))
        .expect("open in-memory store")
}

pub fn disk_config(dir: &TempDir) -> StoreConfig {
    StoreConfig::on_disk("grc", dir.path()).with_schema_version(CURRENT_VERSION)
}

pub fn open_disk(dir: &TempDir) -> Store {
    Store::open(disk_config(dir), catalog()).expect("open file-backed store")
}

pub fn create_temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}
