//! Schema migration for grcstore
//!
//! Migration is a diff between the shape found on disk and the shape the
//! catalog declares, never a chain of version-specific steps.
//!
//! # Design Principles
//!
//! - Additive only: create missing collections and missing indexes
//! - Existing records and indexes are never touched
//! - The version only moves forward
//! - Idempotent: nothing missing at the same version writes nothing
//!
//! # Invariants
//!
//! - An upgrade is committed as one batch: old shape or new shape, never
//!   a mix
//! - Any failure leaves the pre-upgrade shape in place

mod engine;
mod errors;
mod plan;

pub use engine::{open_or_upgrade, MigrationReport, MigrationTarget};
pub use errors::{MigrationError, MigrationResult};
pub use plan::{plan, DatasetShape, MigrationPlan};
