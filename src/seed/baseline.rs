//! Baseline dataset loaded on first open and after reset
//!
//! Collections are loaded in declaration order, which is the dependency
//! order: referenced collections come first.

use serde::{Deserialize, Serialize};

use crate::engine::{StoreError, StoreResult};
use crate::schema::{Record, SchemaCatalog, META_COLLECTION};

/// Records destined for one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineCollection {
    pub name: String,
    #[serde(default)]
    pub records: Vec<Record>,
}

/// Ordered baseline dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    #[serde(default)]
    pub collections: Vec<BaselineCollection>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends records for `name`, loaded after everything added before
    pub fn collection(mut self, name: impl Into<String>, records: Vec<Record>) -> Self {
        self.collections.push(BaselineCollection {
            name: name.into(),
            records,
        });
        self
    }

    /// Parses `{"collections": [{"name": .., "records": [..]}, ..]}`
    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidBaseline(format!("invalid baseline JSON: {}", e)))
    }

    pub fn record_count(&self) -> usize {
        self.collections.iter().map(|c| c.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Checks every collection is declared and none is the metadata
    /// collection.
    pub fn validate(&self, catalog: &SchemaCatalog) -> StoreResult<()> {
        for collection in &self.collections {
            if collection.name == META_COLLECTION {
                return Err(StoreError::InvalidBaseline(format!(
                    "baseline must not write '{}'",
                    META_COLLECTION
                )));
            }
            if !catalog.contains(&collection.name) {
                return Err(StoreError::UnknownCollection(collection.name.clone()));
            }
        }
        Ok(())
    }
}
