//! # Migration Errors

use thiserror::Error;

use crate::storage::StorageError;

/// Result type for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Reasons a schema upgrade can be refused or aborted.
///
/// Every variant leaves the dataset at its pre-upgrade shape.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Substrate failure while committing the upgrade; retry is safe
    #[error("Migration aborted by storage failure: {0}")]
    Io(#[from] StorageError),

    /// Target version below the on-disk version, or a collection/index removal
    #[error("Unsupported downgrade: {reason}")]
    UnsupportedDowngrade { reason: String },

    /// On-disk definition differs from the declared one
    #[error("Collection '{collection}' conflicts with its declaration: {reason}")]
    ShapeConflict { collection: String, reason: String },

    /// New index cannot be built over existing records
    #[error("Cannot build index '{index}' on '{collection}': {reason}")]
    IndexBuild {
        collection: String,
        index: String,
        reason: String,
    },
}

impl MigrationError {
    pub fn downgrade(reason: impl Into<String>) -> Self {
        MigrationError::UnsupportedDowngrade {
            reason: reason.into(),
        }
    }

    pub fn shape_conflict(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        MigrationError::ShapeConflict {
            collection: collection.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same open can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, MigrationError::Io(e) if !e.is_fatal())
    }
}
