//! Storage engine for grcstore
//!
//! Generic per-collection operations over the replayed dataset: fetch by
//! key, fetch all, upsert, insert, delete, clear, count, index lookup and
//! bulk upsert.
//!
//! # Design Principles
//!
//! - Catalog-driven: unknown collections and indexes are rejected
//! - Log first: a write is durable before it is visible
//! - Writes to one collection are serialized, reads run concurrently
//! - Migration and seeding see the whole dataset exclusively
//!
//! # Invariants
//!
//! - Primary-key values are unique per collection
//! - Unique-index values have at most one holder
//! - Indexes always reflect the records they cover

mod collection;
mod dataset;
mod errors;
mod store;
mod txn;

pub use errors::{StoreError, StoreResult};
pub use store::Store;
pub use txn::ExclusiveTxn;
