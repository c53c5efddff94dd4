//! Durability Tests
//!
//! File-backed stores:
//! - Reopen restores records, indexes, version and seed marker
//! - A torn trailing frame is discarded; earlier batches survive
//! - Corruption before the tail is never ignored
//! - Compaction keeps the dataset intact

mod common;

use std::fs::{self, OpenOptions};
use std::io::Write;

use common::{baseline, catalog, create_temp_data_dir, disk_config, open_disk, record, CURRENT_VERSION};
use grcstore::storage::StorageErrorCode;
use grcstore::{FileBackend, SeedState, Store, StoreConfig, StoreError};
use serde_json::json;

fn log_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
    FileBackend::log_path(dir.path(), "grc")
}

// =============================================================================
// Reopen
// =============================================================================

#[test]
fn test_reopen_restores_everything() {
    let dir = create_temp_data_dir();
    {
        let store = open_disk(&dir);
        store.ensure_seeded(&baseline()).unwrap();
        store
            .put("widgets", record(json!({"id": "w1", "tenant_id": "A", "status": "open"})))
            .unwrap();
        store
            .put(
                "control_mappings",
                record(json!({"framework_id": "iso", "control_id": "A.5", "tenant_id": "A"})),
            )
            .unwrap();
        store.delete("users", &json!("u1")).unwrap();
    }
    assert!(log_path(&dir).exists());

    let store = open_disk(&dir);
    assert!(!store.last_migration().applied);
    assert_eq!(store.schema_version().unwrap(), CURRENT_VERSION);
    assert_eq!(store.seed_state().unwrap(), SeedState::Seeded);

    assert_eq!(store.count("frameworks").unwrap(), 3);
    assert!(store.get("users", &json!("u1")).unwrap().is_none());
    assert!(store
        .get("control_mappings", &json!(["iso", "A.5"]))
        .unwrap()
        .is_some());
    assert_eq!(
        store.get_by_index("widgets", "status", &json!("open")).unwrap().len(),
        1
    );
    assert_eq!(store.get_all_for_tenant("widgets", "A").unwrap().len(), 1);
}

// =============================================================================
// Torn tail
// =============================================================================

#[test]
fn test_torn_tail_discarded() {
    let dir = create_temp_data_dir();
    {
        let store = open_disk(&dir);
        store.put("assets", record(json!({"id": "a1"}))).unwrap();
    }
    let intact_len = fs::metadata(log_path(&dir)).unwrap().len();

    // a frame header promising more bytes than were written
    {
        let mut file = OpenOptions::new().append(true).open(log_path(&dir)).unwrap();
        file.write_all(&[0x40, 0x00, 0x00, 0x00, 0x07, 0x00]).unwrap();
        file.sync_all().unwrap();
    }

    {
        let store = open_disk(&dir);
        assert_eq!(store.count("assets").unwrap(), 1);
        assert_eq!(fs::metadata(log_path(&dir)).unwrap().len(), intact_len);

        // appends land after the intact prefix
        store.put("assets", record(json!({"id": "a2"}))).unwrap();
    }

    let store = open_disk(&dir);
    assert_eq!(store.count("assets").unwrap(), 2);
}

// =============================================================================
// Corruption
// =============================================================================

#[test]
fn test_corruption_is_fatal() {
    let dir = create_temp_data_dir();
    {
        let store = open_disk(&dir);
        store.put("assets", record(json!({"id": "a1"}))).unwrap();
    }

    // flip a byte inside the first batch body
    {
        let mut contents = fs::read(log_path(&dir)).unwrap();
        contents[20] ^= 0xFF;
        fs::write(log_path(&dir), contents).unwrap();
    }

    let err = Store::open(disk_config(&dir), catalog()).err().unwrap();
    match err {
        StoreError::Storage(e) => {
            assert_eq!(e.code(), StorageErrorCode::GrcDataCorruption);
            assert!(e.is_fatal());
        }
        other => panic!("expected storage corruption, got {:?}", other),
    }
}

#[test]
fn test_damaged_length_mid_log_is_fatal() {
    let dir = create_temp_data_dir();
    let mut frame_starts = Vec::new();
    {
        let store = open_disk(&dir);
        for i in 0..5 {
            frame_starts.push(fs::metadata(log_path(&dir)).map(|m| m.len()).unwrap_or(0));
            store.put("assets", record(json!({"id": format!("a{}", i)}))).unwrap();
        }
    }
    let intact = fs::read(log_path(&dir)).unwrap();

    // the second asset frame now claims to run past the end of the log
    {
        let mut contents = intact.clone();
        contents[frame_starts[1] as usize + 2] ^= 0x40;
        fs::write(log_path(&dir), contents).unwrap();
    }

    let err = Store::open(disk_config(&dir), catalog()).err().unwrap();
    match err {
        StoreError::Storage(e) => assert_eq!(e.code(), StorageErrorCode::GrcDataCorruption),
        other => panic!("expected storage corruption, got {:?}", other),
    }
    // nothing was truncated away
    assert_eq!(fs::read(log_path(&dir)).unwrap().len(), intact.len());
}

// =============================================================================
// Compaction
// =============================================================================

#[test]
fn test_compaction_shrinks_and_preserves() {
    let dir = create_temp_data_dir();
    {
        let store = open_disk(&dir);
        store.ensure_seeded(&baseline()).unwrap();
        for i in 0..50 {
            store
                .put("assets", record(json!({"id": "hot", "rev": i})))
                .unwrap();
        }
        let before = fs::metadata(log_path(&dir)).unwrap().len();
        store.compact().unwrap();
        assert!(fs::metadata(log_path(&dir)).unwrap().len() < before);
    }

    let store = open_disk(&dir);
    assert_eq!(store.seed_state().unwrap(), SeedState::Seeded);
    assert_eq!(store.get("assets", &json!("hot")).unwrap().unwrap()["rev"], 49);
    assert_eq!(store.count("frameworks").unwrap(), 3);
}

#[test]
fn test_compact_on_open() {
    let dir = create_temp_data_dir();
    {
        let store = open_disk(&dir);
        for i in 0..20 {
            store.put("assets", record(json!({"id": "hot", "rev": i}))).unwrap();
        }
    }
    let before = fs::metadata(log_path(&dir)).unwrap().len();

    let config = StoreConfig {
        compact_on_open: true,
        ..disk_config(&dir)
    };
    let store = Store::open(config, catalog()).unwrap();
    assert!(fs::metadata(log_path(&dir)).unwrap().len() < before);
    assert_eq!(store.get("assets", &json!("hot")).unwrap().unwrap()["rev"], 19);
}

// =============================================================================
// Configuration file
// =============================================================================

#[test]
fn test_open_from_config_file() {
    let dir = create_temp_data_dir();
    let config_path = dir.path().join("grcstore.json");
    fs::write(
        &config_path,
        serde_json::to_string(&json!({
            "name": "audit",
            "data_dir": dir.path().join("data"),
            "schema_version": CURRENT_VERSION,
            "tenant_policy": "stamp",
        }))
        .unwrap(),
    )
    .unwrap();

    let config = StoreConfig::load(&config_path).unwrap();
    {
        let store = Store::open(config.clone(), catalog()).unwrap();
        store
            .partition("A")
            .add("widgets", record(json!({"status": "open"})))
            .unwrap();
    }
    assert!(FileBackend::log_path(&dir.path().join("data"), "audit").exists());

    let store = Store::open(config, catalog()).unwrap();
    assert_eq!(store.partition("A").count("widgets").unwrap(), 1);
}
