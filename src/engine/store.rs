//! The store: catalog-checked operations over a replayed dataset.
//!
//! # Locking
//!
//! Lock order is always gate, then collection, then commit log.
//!
//! - `gate`: shared by every ordinary operation, exclusive for migration,
//!   seeding, reset and compaction
//! - one `RwLock` per collection: shared for reads, exclusive for writes,
//!   so writes to one collection are serialized
//! - `log`: serializes appends and hands out batch sequences
//!
//! Every write validates first, appends its batch, then applies in memory.
//! A failed append leaves memory untouched.

use std::sync::{Mutex, RwLock};

use serde_json::Value;

use super::collection::CollectionState;
use super::dataset::{lock_mutex, read_lock, write_lock, Dataset};
use super::errors::{StoreError, StoreResult};
use super::txn::ExclusiveTxn;
use crate::config::StoreConfig;
use crate::migration::{open_or_upgrade, DatasetShape, MigrationError, MigrationReport};
use crate::observability::{log_event, Event, Logger, Severity};
use crate::schema::{Record, SchemaCatalog, Scope};
use crate::storage::{
    Batch, FileBackend, LogBackend, MemoryBackend, Mutation, StorageError, StorageResult,
};

struct LogSink {
    backend: Box<dyn LogBackend>,
    next_sequence: u64,
}

impl LogSink {
    fn commit(&mut self, mutations: Vec<Mutation>) -> StorageResult<()> {
        let batch = Batch::new(self.next_sequence, mutations);
        self.backend.append(&batch)?;
        self.next_sequence += 1;
        Ok(())
    }
}

/// Embedded, schema-managed document store.
///
/// `Store` is `Send + Sync`; share it behind an `Arc`.
pub struct Store {
    config: StoreConfig,
    catalog: SchemaCatalog,
    gate: RwLock<Dataset>,
    log: Mutex<LogSink>,
    migration: MigrationReport,
}

/// FATAL only when the log itself cannot be trusted.
fn open_failure_severity(error: &StoreError) -> Severity {
    match error {
        StoreError::Storage(e) | StoreError::Migration(MigrationError::Io(e)) if e.is_fatal() => {
            Severity::Fatal
        }
        _ => Severity::Error,
    }
}

impl Store {
    /// Opens the store described by `config`: file-backed when `data_dir`
    /// is set, in memory otherwise.
    pub fn open(config: StoreConfig, catalog: SchemaCatalog) -> StoreResult<Self> {
        config.validate()?;
        let backend: Box<dyn LogBackend> = match &config.data_dir {
            Some(dir) => Box::new(FileBackend::open(dir, &config.name, config.sync_writes)?),
            None => Box::new(MemoryBackend::new()),
        };
        Self::open_with_backend(config, catalog, backend)
    }

    /// Opens the store over an explicit log backend.
    ///
    /// Replays the log, rebuilds indexes, then upgrades the dataset to
    /// `config.schema_version`.
    pub fn open_with_backend(
        config: StoreConfig,
        catalog: SchemaCatalog,
        backend: Box<dyn LogBackend>,
    ) -> StoreResult<Self> {
        Logger::set_min_severity(config.log_level);
        let location = backend.describe();
        log_event(
            Event::StoreOpenBegin,
            &[("name", &config.name), ("log", &location)],
        );

        match Self::open_inner(config, catalog, backend) {
            Ok(store) => {
                let version = store.schema_version()?;
                log_event(
                    Event::StoreOpenComplete,
                    &[
                        ("name", &store.config.name),
                        ("schema_version", &version.to_string()),
                        ("collections", &store.catalog.len().to_string()),
                    ],
                );
                Ok(store)
            }
            Err(e) => {
                Logger::log(
                    open_failure_severity(&e),
                    Event::StoreOpenFailed.as_str(),
                    &[("log", &location), ("error", &e.to_string())],
                );
                Err(e)
            }
        }
    }

    fn open_inner(
        config: StoreConfig,
        catalog: SchemaCatalog,
        mut backend: Box<dyn LogBackend>,
    ) -> StoreResult<Self> {
        config.validate()?;
        if let Some(registry) = &config.tenant_registry {
            if catalog.scope_of(registry) != Some(Scope::Global) {
                return Err(StoreError::InvalidConfig(format!(
                    "tenant_registry '{}' must be a declared global collection",
                    registry
                )));
            }
        }

        let batches = backend.load()?;
        let next_sequence = batches.last().map_or(1, |b| b.sequence + 1);
        let dataset = Dataset::replay(&batches)?;

        let mut store = Self {
            config,
            catalog,
            gate: RwLock::new(dataset),
            log: Mutex::new(LogSink {
                backend,
                next_sequence,
            }),
            migration: MigrationReport {
                from_version: 0,
                to_version: 0,
                collections_created: 0,
                indexes_added: 0,
                applied: false,
            },
        };

        store.migration = store.migrate()?;
        if store.config.compact_on_open {
            store.compact()?;
        }
        Ok(store)
    }

    fn migrate(&self) -> StoreResult<MigrationReport> {
        let target_version = self.config.schema_version;
        let report = self.exclusive(|txn| {
            let current = txn.version();
            open_or_upgrade(txn, current, target_version, &self.catalog)
        })?;
        Ok(report)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// What the migration run during `open` did
    pub fn last_migration(&self) -> &MigrationReport {
        &self.migration
    }

    /// Persisted schema version
    pub fn schema_version(&self) -> StoreResult<u32> {
        Ok(read_lock(&self.gate, "store")?.version())
    }

    /// Collections and indexes present in the dataset
    pub fn shape(&self) -> StoreResult<DatasetShape> {
        Ok(read_lock(&self.gate, "store")?.shape()?)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    fn read_collection<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&CollectionState) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let gate = read_lock(&self.gate, "store")?;
        let state = read_lock(gate.collection(collection)?, collection)?;
        f(&state)
    }

    /// Record under `key`, `None` on a miss.
    ///
    /// `key` is a scalar for single-field keys and an array in key-field
    /// order for composite keys.
    pub fn get(&self, collection: &str, key: &Value) -> StoreResult<Option<Record>> {
        self.read_collection(collection, |state| {
            let pk = state.lookup_key(key)?;
            Ok(state.get(&pk).cloned())
        })
    }

    /// Every record of the collection. Order is not part of the contract.
    pub fn get_all(&self, collection: &str) -> StoreResult<Vec<Record>> {
        self.read_collection(collection, |state| Ok(state.records().cloned().collect()))
    }

    /// Records whose `index` value equals `value`. A unique index returns
    /// at most one.
    pub fn get_by_index(
        &self,
        collection: &str,
        index: &str,
        value: &Value,
    ) -> StoreResult<Vec<Record>> {
        self.read_collection(collection, |state| state.by_index(index, value))
    }

    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        self.read_collection(collection, |state| Ok(state.count()))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    fn write_collection<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut CollectionState) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let gate = read_lock(&self.gate, "store")?;
        let mut state = write_lock(gate.collection(collection)?, collection)?;
        f(&mut state)
    }

    fn commit(&self, mutations: Vec<Mutation>) -> StorageResult<()> {
        lock_mutex(&self.log, "commit log")?.commit(mutations)
    }

    /// Applies tenant policy and registry checks to a write.
    pub(crate) fn admit(
        &self,
        collection: &str,
        mut record: Record,
        acting_tenant: Option<&str>,
    ) -> StoreResult<Record> {
        let descriptor = self
            .catalog
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;
        if !descriptor.is_tenant_scoped() {
            return Ok(record);
        }

        let tenant_id = self
            .config
            .tenant_policy
            .resolve(collection, &mut record, acting_tenant)?;
        self.check_tenant(&tenant_id)?;
        Ok(record)
    }

    fn check_tenant(&self, tenant_id: &str) -> StoreResult<()> {
        let Some(registry) = &self.config.tenant_registry else {
            return Ok(());
        };
        let known = self.read_collection(registry, |state| {
            Ok(state
                .lookup_key(&Value::String(tenant_id.to_string()))
                .map(|pk| state.contains(&pk))
                .unwrap_or(false))
        })?;
        if known {
            Ok(())
        } else {
            Err(StoreError::UnknownTenant {
                tenant_id: tenant_id.to_string(),
            })
        }
    }

    /// Upsert by primary key; full replace.
    pub fn put(&self, collection: &str, record: Record) -> StoreResult<()> {
        self.put_as(collection, record, None)
    }

    pub(crate) fn put_as(
        &self,
        collection: &str,
        record: Record,
        acting_tenant: Option<&str>,
    ) -> StoreResult<()> {
        let record = self.admit(collection, record, acting_tenant)?;
        self.write_collection(collection, |state| {
            let pk = state.primary_key(&record)?;
            if let (Some(owner), Some(existing)) = (acting_tenant, state.get(&pk)) {
                if state.descriptor().is_tenant_scoped()
                    && !crate::tenant::belongs_to(existing, owner)
                {
                    return Err(StoreError::TenantMismatch {
                        collection: collection.to_string(),
                        key: pk.to_string(),
                    });
                }
            }
            state.check_unique(&pk, &record)?;
            self.commit(vec![Mutation::put(collection, record.clone())])?;
            state.apply_put(pk, record);
            Ok(())
        })
    }

    /// Insert-only. Returns the stored record, including a generated `id`
    /// when the collection is keyed by `id` and the record had none.
    pub fn add(&self, collection: &str, record: Record) -> StoreResult<Record> {
        self.add_as(collection, record, None)
    }

    pub(crate) fn add_as(
        &self,
        collection: &str,
        record: Record,
        acting_tenant: Option<&str>,
    ) -> StoreResult<Record> {
        let mut record = self.admit(collection, record, acting_tenant)?;
        self.write_collection(collection, |state| {
            state.assign_id(&mut record);
            let pk = state.primary_key(&record)?;
            if state.contains(&pk) {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    key: pk.to_string(),
                });
            }
            state.check_unique(&pk, &record)?;
            self.commit(vec![Mutation::put(collection, record.clone())])?;
            state.apply_put(pk, record.clone());
            Ok(record)
        })
    }

    /// Idempotent delete; a missing key writes nothing.
    pub fn delete(&self, collection: &str, key: &Value) -> StoreResult<()> {
        self.delete_owned(collection, key, None)
    }

    /// Deletes unless the record belongs to a tenant other than `owner`.
    pub(crate) fn delete_owned(
        &self,
        collection: &str,
        key: &Value,
        owner: Option<&str>,
    ) -> StoreResult<()> {
        self.write_collection(collection, |state| {
            let pk = state.lookup_key(key)?;
            let Some(existing) = state.get(&pk) else {
                return Ok(());
            };
            if let Some(owner) = owner {
                if state.descriptor().is_tenant_scoped()
                    && !crate::tenant::belongs_to(existing, owner)
                {
                    return Ok(());
                }
            }
            self.commit(vec![Mutation::delete(collection, pk.to_lookup())])?;
            state.apply_delete(&pk);
            Ok(())
        })
    }

    /// Removes every record of the collection.
    pub fn clear(&self, collection: &str) -> StoreResult<()> {
        self.write_collection(collection, |state| {
            if state.count() == 0 {
                return Ok(());
            }
            self.commit(vec![Mutation::clear(collection)])?;
            state.clear();
            Ok(())
        })
    }

    /// Many upserts into one collection as one atomic batch.
    ///
    /// Key and unique checks cover the existing records and the batch
    /// itself; on any failure nothing is written.
    pub fn bulk_put(&self, collection: &str, records: Vec<Record>) -> StoreResult<()> {
        if records.is_empty() {
            // unknown names still fail
            return self.count(collection).map(|_| ());
        }

        let records = records
            .into_iter()
            .map(|r| self.admit(collection, r, None))
            .collect::<StoreResult<Vec<_>>>()?;

        self.write_collection(collection, |state| {
            let mut scratch = state.clone();
            let mut mutations = Vec::with_capacity(records.len());
            for record in records {
                scratch.put_checked(record.clone())?;
                mutations.push(Mutation::put(collection, record));
            }
            self.commit(mutations)?;
            *state = scratch;
            Ok(())
        })
    }

    // ========================================================================
    // Store-wide sections
    // ========================================================================

    /// Runs `f` with the whole dataset to itself.
    ///
    /// New operations block until it returns. Changes staged through the
    /// transaction are committed as one batch only if `f` succeeds.
    pub(crate) fn exclusive<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut ExclusiveTxn<'_>) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut gate = write_lock(&self.gate, "store")?;
        let scratch = gate.try_clone()?;

        let mut txn = ExclusiveTxn::new(&self.catalog, scratch);
        let value = f(&mut txn)?;

        let (scratch, staged) = txn.finish();
        if !staged.is_empty() {
            self.commit(staged)?;
            *gate = scratch;
        }
        Ok(value)
    }

    /// Rewrites the commit log as a single snapshot batch.
    pub fn compact(&self) -> StoreResult<()> {
        let gate = write_lock(&self.gate, "store")?;
        let mutations = gate.snapshot_mutations()?;
        let records = mutations
            .iter()
            .filter(|m| matches!(m, Mutation::Put { .. }))
            .count();

        let mut log = lock_mutex(&self.log, "commit log")?;
        let sequence = log.next_sequence;
        log.backend.rewrite(&[Batch::new(sequence, mutations)])?;
        log.next_sequence += 1;

        log_event(
            Event::CompactionComplete,
            &[
                ("log", &log.backend.describe()),
                ("sequence", &sequence.to_string()),
                ("records", &records.to_string()),
            ],
        );
        Ok(())
    }
}
