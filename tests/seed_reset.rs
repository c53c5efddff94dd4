//! Seed/Reset Controller Tests
//!
//! - First open seeds, later opens skip
//! - Concurrent callers seed exactly once
//! - Reset restores the baseline and drops everything else
//! - Bad baselines write nothing

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{baseline, catalog, memory_config, open_memory, record};
use grcstore::{
    Baseline, MemoryBackend, SeedOutcome, SeedState, Store, StoreConfig, StoreError, TenantPolicy,
};
use serde_json::json;

fn open_seeded(backend: &MemoryBackend) -> (Store, SeedOutcome) {
    let store = open_memory(backend);
    let outcome = store.ensure_seeded(&baseline()).unwrap();
    (store, outcome)
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_sequential_opens_seed_once() {
    let backend = MemoryBackend::new();

    let (store, outcome) = open_seeded(&backend);
    assert_eq!(outcome, SeedOutcome::Seeded { records: 6 });
    assert_eq!(store.seed_state().unwrap(), SeedState::Seeded);
    drop(store);
    let after_first = backend.len_bytes();

    let (store, outcome) = open_seeded(&backend);
    assert_eq!(outcome, SeedOutcome::AlreadySeeded);
    assert_eq!(backend.len_bytes(), after_first);

    assert_eq!(store.count("tenants").unwrap(), 2);
    assert_eq!(store.count("frameworks").unwrap(), 3);
    assert_eq!(store.count("users").unwrap(), 1);
    assert_eq!(
        store
            .get_by_index("frameworks", "code", &json!("SOC2"))
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_open_seeded_convenience() {
    let (store, outcome) =
        Store::open_seeded(memory_config(), catalog(), &baseline()).unwrap();
    assert!(outcome.seeded());

    let marker = store.seed_marker().unwrap().unwrap();
    assert_eq!(marker.record_count, 6);
    assert_eq!(marker.schema_version, store.schema_version().unwrap());
}

#[test]
fn test_seeded_frameworks_get_generated_ids() {
    let backend = MemoryBackend::new();
    let (store, _) = open_seeded(&backend);

    let frameworks = store.get_all("frameworks").unwrap();
    assert!(frameworks
        .iter()
        .all(|f| f["id"].as_str().is_some_and(|id| !id.is_empty())));
    assert_eq!(store.get("users", &json!("u1")).unwrap().unwrap()["role"], "admin");
}

#[test]
fn test_seed_keeps_user_data_after_marker() {
    let backend = MemoryBackend::new();
    {
        let (store, _) = open_seeded(&backend);
        store.put("assets", record(json!({"id": "a1"}))).unwrap();
        store.delete("users", &json!("u1")).unwrap();
    }

    let (store, outcome) = open_seeded(&backend);
    assert_eq!(outcome, SeedOutcome::AlreadySeeded);
    assert_eq!(store.count("assets").unwrap(), 1);
    assert!(store.get("users", &json!("u1")).unwrap().is_none());
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_ensure_seeded_seeds_once() {
    let backend = MemoryBackend::new();
    let store = Arc::new(open_memory(&backend));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.ensure_seeded(&baseline()).unwrap()
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(outcomes.iter().filter(|o| o.seeded()).count(), 1);
    assert_eq!(store.count("frameworks").unwrap(), 3);
    assert_eq!(store.count("tenants").unwrap(), 2);
}

#[test]
fn test_reads_during_seeding_see_before_or_after() {
    let backend = MemoryBackend::new();
    let store = Arc::new(open_memory(&backend));

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..200 {
                let n = store.count("frameworks").unwrap();
                assert!(n == 0 || n == 3, "observed partial seed: {}", n);
            }
        })
    };
    store.ensure_seeded(&baseline()).unwrap();
    reader.join().unwrap();
}

// =============================================================================
// Reset
// =============================================================================

#[test]
fn test_reset_restores_baseline() {
    let backend = MemoryBackend::new();
    let (store, _) = open_seeded(&backend);
    let first_marker = store.seed_marker().unwrap().unwrap();

    store.put("tenants", record(json!({"id": "C"}))).unwrap();
    store.put("assets", record(json!({"id": "a1"}))).unwrap();
    store.delete("users", &json!("u1")).unwrap();

    let outcome = store.reset(&baseline()).unwrap();
    assert_eq!(outcome, SeedOutcome::Seeded { records: 6 });

    assert_eq!(store.count("tenants").unwrap(), 2);
    assert!(store.get("tenants", &json!("C")).unwrap().is_none());
    assert_eq!(store.count("assets").unwrap(), 0);
    assert!(store.get("users", &json!("u1")).unwrap().is_some());

    let marker = store.seed_marker().unwrap().unwrap();
    assert!(marker.seeded_at >= first_marker.seeded_at);

    // the reset survives a reopen
    drop(store);
    let (store, outcome) = open_seeded(&backend);
    assert_eq!(outcome, SeedOutcome::AlreadySeeded);
    assert_eq!(store.count("assets").unwrap(), 0);
}

#[test]
fn test_reset_from_unseeded() {
    let backend = MemoryBackend::new();
    let store = open_memory(&backend);
    store.put("assets", record(json!({"id": "a1"}))).unwrap();

    store.reset(&baseline()).unwrap();
    assert_eq!(store.seed_state().unwrap(), SeedState::Seeded);
    assert_eq!(store.count("assets").unwrap(), 0);
}

// =============================================================================
// Bad baselines
// =============================================================================

#[test]
fn test_unknown_collection_in_baseline_writes_nothing() {
    let backend = MemoryBackend::new();
    let store = open_memory(&backend);
    let before = backend.len_bytes();

    let bad = baseline().collection("ghosts", vec![record(json!({"id": "g1"}))]);
    let err = store.ensure_seeded(&bad).unwrap_err();
    assert!(matches!(err, StoreError::UnknownCollection(_)));
    assert_eq!(backend.len_bytes(), before);
    assert_eq!(store.count("tenants").unwrap(), 0);
    assert_eq!(store.seed_state().unwrap(), SeedState::Unseeded);

    let err = store.reset(&bad).unwrap_err();
    assert!(matches!(err, StoreError::UnknownCollection(_)));
}

#[test]
fn test_baseline_from_json() {
    let backend = MemoryBackend::new();
    let store = open_memory(&backend);

    let json = r#"{
        "collections": [
            {"name": "tenants", "records": [{"id": "A"}]},
            {"name": "widgets", "records": [
                {"id": "w1", "tenant_id": "A", "status": "open"},
                {"tenant_id": "A", "status": "closed"}
            ]}
        ]
    }"#;
    let outcome = store.ensure_seeded(&Baseline::from_json(json).unwrap()).unwrap();
    assert_eq!(outcome, SeedOutcome::Seeded { records: 3 });
    assert_eq!(store.get_all_for_tenant("widgets", "A").unwrap().len(), 2);
    assert_eq!(
        store.get_by_index("widgets", "status", &json!("closed")).unwrap().len(),
        1
    );
}

// =============================================================================
// Tenant-scoped baseline rows
// =============================================================================

fn tenant_rows(widgets: serde_json::Value) -> Baseline {
    Baseline::new()
        .collection("tenants", vec![record(json!({"id": "A"}))])
        .collection(
            "widgets",
            widgets
                .as_array()
                .unwrap()
                .iter()
                .map(|w| record(w.clone()))
                .collect(),
        )
}

fn open_with(config: StoreConfig, backend: &MemoryBackend) -> Store {
    Store::open_with_backend(config, catalog(), Box::new(backend.clone())).unwrap()
}

#[test]
fn test_baseline_rows_without_tenant_are_rejected() {
    for policy in [TenantPolicy::Reject, TenantPolicy::Stamp] {
        let backend = MemoryBackend::new();
        let store = open_with(memory_config().with_tenant_policy(policy), &backend);
        let before = backend.len_bytes();

        let bad = tenant_rows(json!([{"id": "w1", "tenant_id": "A"}, {"id": "w2"}]));
        let err = store.ensure_seeded(&bad).unwrap_err();
        assert!(matches!(err, StoreError::InvalidBaseline(_)), "{:?}", err);
        assert_eq!(store.seed_state().unwrap(), SeedState::Unseeded);
        assert_eq!(store.count("widgets").unwrap(), 0);

        let err = store.reset(&bad).unwrap_err();
        assert!(matches!(err, StoreError::InvalidBaseline(_)));
        assert_eq!(backend.len_bytes(), before);
    }
}

#[test]
fn test_baseline_rows_checked_against_registry() {
    let backend = MemoryBackend::new();
    let store = open_with(memory_config().with_tenant_registry("tenants"), &backend);

    let ghost = tenant_rows(json!([
        {"id": "w1", "tenant_id": "A"},
        {"id": "w2", "tenant_id": "GHOST"}
    ]));
    let err = store.ensure_seeded(&ghost).unwrap_err();
    assert!(matches!(err, StoreError::InvalidBaseline(_)), "{:?}", err);
    let err = store.reset(&ghost).unwrap_err();
    assert!(matches!(err, StoreError::InvalidBaseline(_)));
    assert_eq!(store.count("tenants").unwrap(), 0);

    // tenants loaded earlier in the same baseline are known
    let good = tenant_rows(json!([{"id": "w1", "tenant_id": "A"}]));
    assert_eq!(
        store.ensure_seeded(&good).unwrap(),
        SeedOutcome::Seeded { records: 2 }
    );
    assert_eq!(store.get_all_for_tenant("widgets", "A").unwrap().len(), 1);
}
