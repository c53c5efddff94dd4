//! Commit log content: batches of mutations.
//!
//! A batch is the unit of atomicity. Either every mutation in it is replayed
//! or, if its frame never made it fully to disk, none are.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{CollectionDescriptor, IndexDescriptor, Record};

/// One logical change to the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Advance the persisted schema version
    SetVersion { version: u32 },
    /// Create an empty collection with the descriptor's indexes
    CreateCollection { descriptor: CollectionDescriptor },
    /// Add one index to an existing collection, built over its records
    CreateIndex {
        collection: String,
        index: IndexDescriptor,
    },
    /// Upsert one record
    Put { collection: String, record: Record },
    /// Remove one record by primary-key lookup value
    Delete { collection: String, key: Value },
    /// Remove every record of a collection
    Clear { collection: String },
}

impl Mutation {
    pub fn put(collection: &str, record: Record) -> Self {
        Mutation::Put {
            collection: collection.to_string(),
            record,
        }
    }

    pub fn delete(collection: &str, key: Value) -> Self {
        Mutation::Delete {
            collection: collection.to_string(),
            key,
        }
    }

    pub fn clear(collection: &str) -> Self {
        Mutation::Clear {
            collection: collection.to_string(),
        }
    }

    /// Whether this mutation changes schema shape rather than records
    pub fn is_schema_change(&self) -> bool {
        matches!(
            self,
            Mutation::SetVersion { .. }
                | Mutation::CreateCollection { .. }
                | Mutation::CreateIndex { .. }
        )
    }
}

/// Sequenced group of mutations committed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Strictly increasing across the log
    pub sequence: u64,
    pub mutations: Vec<Mutation>,
}

impl Batch {
    pub fn new(sequence: u64, mutations: Vec<Mutation>) -> Self {
        Self {
            sequence,
            mutations,
        }
    }
}
