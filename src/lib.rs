//! grcstore - A schema-managed, versioned, multi-tenant embedded document store
//!
//! Every collection and index is declared up front in a [`SchemaCatalog`].
//! Opening a [`Store`] replays its commit log, then upgrades the dataset to
//! the configured schema version. Records are JSON objects keyed by one or
//! more fields; tenant-scoped collections are partitioned by `tenant_id`.
//!
//! ```ignore
//! let catalog = SchemaCatalog::builder()
//!     .collection(CollectionDescriptor::global("tenants", KeyPath::single("id")))
//!     .collection(
//!         CollectionDescriptor::tenant("risks", KeyPath::single("id"))
//!             .with_index(IndexDescriptor::on("owner")),
//!     )
//!     .build();
//!
//! let (store, _) = Store::open_seeded(StoreConfig::in_memory("grc"), catalog, &baseline)?;
//! let risk = store.partition("acme").add("risks", record)?;
//! ```

pub mod config;
pub mod engine;
pub mod handle;
pub mod index;
pub mod migration;
pub mod observability;
pub mod schema;
pub mod seed;
pub mod storage;
pub mod tenant;

pub use config::StoreConfig;
pub use engine::{ExclusiveTxn, Store, StoreError, StoreResult};
pub use handle::AsyncStore;
pub use migration::{MigrationError, MigrationReport};
pub use schema::{CollectionDescriptor, IndexDescriptor, KeyPath, Record, SchemaCatalog, Scope};
pub use seed::{Baseline, SeedMarker, SeedOutcome, SeedState};
pub use storage::{FileBackend, LogBackend, MemoryBackend, StorageError};
pub use tenant::{TenantPartition, TenantPolicy};
