//! # Store Errors
//!
//! Error types surfaced by every public store operation.

use thiserror::Error;

use crate::migration::MigrationError;
use crate::storage::StorageError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    // ==================
    // Schema-shape errors (programmer errors)
    // ==================

    /// Collection name not in the catalog
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Key fields missing or inconsistent with the declared key shape
    #[error("Primary key mismatch in '{collection}': {reason}")]
    PrimaryKeyMismatch { collection: String, reason: String },

    /// Index name not declared on the collection
    #[error("Unknown index '{index}' on '{collection}'")]
    UnknownIndex { collection: String, index: String },

    /// Baseline dataset does not fit the catalog
    #[error("Invalid baseline: {0}")]
    InvalidBaseline(String),

    /// Store configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ==================
    // Data errors (expected, recoverable)
    // ==================

    /// `add` with a primary key that already exists
    #[error("Duplicate key in '{collection}': {key}")]
    DuplicateKey { collection: String, key: String },

    /// Unique index value already held by another record
    #[error("Unique index '{index}' on '{collection}' already holds {value}")]
    UniqueViolation {
        collection: String,
        index: String,
        value: String,
    },

    /// Tenant-scoped write without a tenant id
    #[error("Record for tenant-scoped collection '{collection}' has no tenant_id")]
    TenantRequired { collection: String },

    /// Tenant id not present in the tenant registry
    #[error("Unknown tenant '{tenant_id}'")]
    UnknownTenant { tenant_id: String },

    /// Partition write aimed at a key that holds another tenant's record
    #[error("Record {key} in '{collection}' belongs to another tenant")]
    TenantMismatch { collection: String, key: String },

    // ==================
    // Wrapped subsystem errors
    // ==================

    /// Schema upgrade refused or aborted
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Substrate I/O failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StoreError {
    pub(crate) fn key_mismatch(collection: &str, reason: impl Into<String>) -> Self {
        StoreError::PrimaryKeyMismatch {
            collection: collection.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrong collection, key shape, index or declaration: a bug in the
    /// caller, not worth retrying
    pub fn is_programmer_error(&self) -> bool {
        match self {
            StoreError::UnknownCollection(_)
            | StoreError::PrimaryKeyMismatch { .. }
            | StoreError::UnknownIndex { .. }
            | StoreError::InvalidBaseline(_)
            | StoreError::InvalidConfig(_) => true,
            StoreError::Migration(e) => !matches!(e, MigrationError::Io(_)),
            _ => false,
        }
    }

    /// I/O failures that left state unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Storage(e) => !e.is_fatal(),
            StoreError::Migration(e) => e.is_retryable(),
            _ => false,
        }
    }
}
