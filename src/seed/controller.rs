//! Seed/reset state machine
//!
//! ```text
//!            ensure_seeded            reset
//! Unseeded ───────────────▶ Seeded ◀────────┐
//!                              │            │
//!                              └────────────┘
//! ```
//!
//! The state is the presence of the seed marker in `_meta`. Loading the
//! baseline and writing the marker are one staged batch inside the store's
//! exclusive section, and the marker is checked again inside that section,
//! so concurrent callers seed exactly once.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

use super::baseline::Baseline;
use super::marker::SeedMarker;
use crate::config::StoreConfig;
use crate::engine::{ExclusiveTxn, Store, StoreError, StoreResult};
use crate::observability::{log_event, Event, ObservationScope};
use crate::schema::{Record, SchemaCatalog, Scope, META_COLLECTION};

/// Whether the baseline has been loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedState {
    Unseeded,
    Seeded,
}

impl SeedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeedState::Unseeded => "UNSEEDED",
            SeedState::Seeded => "SEEDED",
        }
    }
}

impl fmt::Display for SeedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of [`Store::ensure_seeded`] and [`Store::reset`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The baseline was loaded and the marker written
    Seeded { records: usize },
    /// The marker was already present; nothing was written
    AlreadySeeded,
}

impl SeedOutcome {
    pub fn seeded(&self) -> bool {
        matches!(self, SeedOutcome::Seeded { .. })
    }
}

fn read_marker(txn: &mut ExclusiveTxn<'_>) -> StoreResult<Option<SeedMarker>> {
    Ok(txn
        .get(META_COLLECTION, &SeedMarker::key())?
        .as_ref()
        .and_then(SeedMarker::from_record))
}

/// Applies the tenant checks a plain store write gets. Registry lookups go
/// to the staged dataset, so tenants loaded earlier in the same baseline
/// count.
fn admit_baseline_record(
    txn: &mut ExclusiveTxn<'_>,
    config: &StoreConfig,
    collection: &str,
    mut record: Record,
) -> StoreResult<Record> {
    if txn.catalog().scope_of(collection) != Some(Scope::Tenant) {
        return Ok(record);
    }
    let tenant_id = config.tenant_policy.resolve(collection, &mut record, None)?;
    if let Some(registry) = &config.tenant_registry {
        if txn.get(registry, &Value::String(tenant_id.clone()))?.is_none() {
            return Err(StoreError::UnknownTenant { tenant_id });
        }
    }
    Ok(record)
}

/// Clears the collections receiving data, loads the baseline in order and
/// stages the marker. Returns the number of baseline records written.
fn load_baseline(
    txn: &mut ExclusiveTxn<'_>,
    config: &StoreConfig,
    baseline: &Baseline,
) -> StoreResult<usize> {
    let mut cleared = BTreeSet::new();
    let mut written = 0;

    for collection in &baseline.collections {
        if cleared.insert(collection.name.as_str()) {
            txn.clear(&collection.name)?;
        }
        for record in &collection.records {
            admit_baseline_record(txn, config, &collection.name, record.clone())
                .and_then(|record| txn.add(&collection.name, record))
                .map_err(|e| match e {
                    StoreError::Storage(_) => e,
                    other => StoreError::InvalidBaseline(format!(
                        "collection '{}': {}",
                        collection.name, other
                    )),
                })?;
            written += 1;
        }
    }

    let marker = SeedMarker::now(written as u64, txn.version());
    txn.put(META_COLLECTION, marker.to_record())?;
    Ok(written)
}

impl Store {
    /// Opens the store and seeds it with `baseline` unless it already is.
    pub fn open_seeded(
        config: StoreConfig,
        catalog: SchemaCatalog,
        baseline: &Baseline,
    ) -> StoreResult<(Self, SeedOutcome)> {
        let store = Self::open(config, catalog)?;
        let outcome = store.ensure_seeded(baseline)?;
        Ok((store, outcome))
    }

    /// The seed marker, if seeding has completed
    pub fn seed_marker(&self) -> StoreResult<Option<SeedMarker>> {
        Ok(self
            .get(META_COLLECTION, &SeedMarker::key())?
            .as_ref()
            .and_then(SeedMarker::from_record))
    }

    pub fn seed_state(&self) -> StoreResult<SeedState> {
        Ok(match self.seed_marker()? {
            Some(_) => SeedState::Seeded,
            None => SeedState::Unseeded,
        })
    }

    /// Loads `baseline` if the dataset has never been seeded.
    ///
    /// Collections named by the baseline are cleared first, then filled in
    /// baseline order. The records and the marker commit as one batch.
    pub fn ensure_seeded(&self, baseline: &Baseline) -> StoreResult<SeedOutcome> {
        if self.seed_marker()?.is_some() {
            log_event(Event::SeedSkipped, &[("name", &self.config().name)]);
            return Ok(SeedOutcome::AlreadySeeded);
        }
        baseline.validate(self.catalog())?;

        let planned = baseline.record_count().to_string();
        let scope = ObservationScope::with_fields(
            "SEED",
            &[("name", &self.config().name), ("records", &planned)],
        );

        let result: StoreResult<_> = self.exclusive(|txn| {
            if read_marker(txn)?.is_some() {
                return Ok(SeedOutcome::AlreadySeeded);
            }
            let records = load_baseline(txn, self.config(), baseline)?;
            Ok(SeedOutcome::Seeded { records })
        });

        match result {
            Ok(SeedOutcome::AlreadySeeded) => {
                scope.complete_with_fields(&[("outcome", "already_seeded")]);
                log_event(Event::SeedSkipped, &[("name", &self.config().name)]);
                Ok(SeedOutcome::AlreadySeeded)
            }
            Ok(outcome) => {
                scope.complete_with_fields(&[("outcome", "seeded")]);
                log_event(
                    Event::SeedStateChanged,
                    &[
                        ("from", SeedState::Unseeded.as_str()),
                        ("to", SeedState::Seeded.as_str()),
                    ],
                );
                Ok(outcome)
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    /// Wipes every managed collection and the marker, then seeds again.
    ///
    /// Runs as one exclusive section: other callers see either the old
    /// dataset or the freshly seeded one.
    pub fn reset(&self, baseline: &Baseline) -> StoreResult<SeedOutcome> {
        baseline.validate(self.catalog())?;

        let scope = ObservationScope::with_fields("RESET", &[("name", &self.config().name)]);
        let managed: Vec<String> = self.catalog().managed().map(str::to_string).collect();

        let result: StoreResult<_> = self.exclusive(|txn| {
            let previous = if read_marker(txn)?.is_some() {
                SeedState::Seeded
            } else {
                SeedState::Unseeded
            };
            for name in &managed {
                txn.clear(name)?;
            }
            txn.delete(META_COLLECTION, SeedMarker::key())?;
            let records = load_baseline(txn, self.config(), baseline)?;
            Ok((previous, records))
        });

        match result {
            Ok((previous, records)) => {
                let cleared = managed.len().to_string();
                let written = records.to_string();
                scope.complete_with_fields(&[
                    ("collections_cleared", &cleared),
                    ("records", &written),
                ]);
                log_event(
                    Event::SeedStateChanged,
                    &[
                        ("from", previous.as_str()),
                        ("to", SeedState::Seeded.as_str()),
                        ("via", "reset"),
                    ],
                );
                Ok(SeedOutcome::Seeded { records })
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CollectionDescriptor, IndexDescriptor, KeyPath, Record};
    use crate::storage::MemoryBackend;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::builder()
            .collection(
                CollectionDescriptor::global("frameworks", KeyPath::single("id"))
                    .with_index(IndexDescriptor::on("code").unique()),
            )
            .collection(CollectionDescriptor::global("notes", KeyPath::single("id")))
            .build()
    }

    fn baseline() -> Baseline {
        Baseline::new().collection(
            "frameworks",
            vec![
                record(json!({"code": "ISO27001"})),
                record(json!({"id": "soc2", "code": "SOC2"})),
            ],
        )
    }

    fn open(backend: &MemoryBackend) -> Store {
        Store::open_with_backend(
            StoreConfig::in_memory("seed"),
            catalog(),
            Box::new(backend.clone()),
        )
        .unwrap()
    }

    #[test]
    fn test_seed_then_skip() {
        let backend = MemoryBackend::new();
        let store = open(&backend);
        assert_eq!(store.seed_state().unwrap(), SeedState::Unseeded);

        let outcome = store.ensure_seeded(&baseline()).unwrap();
        assert_eq!(outcome, SeedOutcome::Seeded { records: 2 });
        assert_eq!(store.seed_state().unwrap(), SeedState::Seeded);
        assert_eq!(store.seed_marker().unwrap().unwrap().record_count, 2);

        let before = backend.len_bytes();
        assert_eq!(
            store.ensure_seeded(&baseline()).unwrap(),
            SeedOutcome::AlreadySeeded
        );
        assert_eq!(backend.len_bytes(), before);
        assert_eq!(store.count("frameworks").unwrap(), 2);
    }

    #[test]
    fn test_seed_clears_target_collections_only() {
        let backend = MemoryBackend::new();
        let store = open(&backend);
        store
            .put("frameworks", record(json!({"id": "stale", "code": "OLD"})))
            .unwrap();
        store.put("notes", record(json!({"id": "n1"}))).unwrap();

        store.ensure_seeded(&baseline()).unwrap();
        assert!(store.get("frameworks", &json!("stale")).unwrap().is_none());
        assert_eq!(store.count("notes").unwrap(), 1);
    }

    #[test]
    fn test_invalid_baseline_writes_nothing() {
        let backend = MemoryBackend::new();
        let store = open(&backend);
        let before = backend.len_bytes();

        let duplicate = Baseline::new().collection(
            "frameworks",
            vec![
                record(json!({"id": "a", "code": "X"})),
                record(json!({"id": "b", "code": "X"})),
            ],
        );
        let err = store.ensure_seeded(&duplicate).unwrap_err();
        assert!(matches!(err, StoreError::InvalidBaseline(_)));

        let unknown = Baseline::new().collection("ghosts", vec![record(json!({"id": "g"}))]);
        let err = store.ensure_seeded(&unknown).unwrap_err();
        assert!(matches!(err, StoreError::UnknownCollection(_)));

        assert_eq!(backend.len_bytes(), before);
        assert_eq!(store.seed_state().unwrap(), SeedState::Unseeded);
    }

    #[test]
    fn test_reset_restores_baseline() {
        let backend = MemoryBackend::new();
        let store = open(&backend);
        store.ensure_seeded(&baseline()).unwrap();
        store.delete("frameworks", &json!("soc2")).unwrap();
        store.put("notes", record(json!({"id": "n1"}))).unwrap();

        let outcome = store.reset(&baseline()).unwrap();
        assert_eq!(outcome, SeedOutcome::Seeded { records: 2 });
        assert_eq!(store.count("frameworks").unwrap(), 2);
        assert_eq!(store.count("notes").unwrap(), 0);
        assert!(store.get("frameworks", &json!("soc2")).unwrap().is_some());
        assert_eq!(store.seed_state().unwrap(), SeedState::Seeded);
    }

    #[test]
    fn test_failed_commit_leaves_unseeded() {
        let backend = MemoryBackend::new();
        let store = open(&backend);

        backend.fail_next_writes(1);
        let err = store.ensure_seeded(&baseline()).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.seed_state().unwrap(), SeedState::Unseeded);
        assert_eq!(store.count("frameworks").unwrap(), 0);

        assert!(store.ensure_seeded(&baseline()).unwrap().seeded());
    }
}
