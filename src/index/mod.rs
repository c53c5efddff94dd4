//! Index structures for grcstore
//!
//! Indexes are derived, in-memory state: they are rebuilt from records when
//! the commit log is replayed and are never persisted on their own.
//!
//! # Invariants
//!
//! - Deterministic: BTreeMap iteration order, sorted primary keys
//! - Only scalar values (bool, number, string) are indexed
//! - Updates happen after the commit log append succeeds

mod key;
mod tree;

pub use key::IndexKey;
pub use tree::IndexTree;
