//! Seed marker: the `_meta` row recording that seeding completed

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{Record, META_KEY_FIELD};

/// `_meta` key of the seed marker row
pub const SEED_MARKER_KEY: &str = "seed_marker";

/// Completion record of a seeding run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedMarker {
    /// When the baseline was committed (UTC)
    pub seeded_at: DateTime<Utc>,
    /// Baseline records written
    pub record_count: u64,
    /// Schema version at seeding time
    pub schema_version: u32,
}

impl SeedMarker {
    pub fn now(record_count: u64, schema_version: u32) -> Self {
        Self {
            seeded_at: Utc::now(),
            record_count,
            schema_version,
        }
    }

    /// Lookup value of the marker row in `_meta`
    pub fn key() -> Value {
        Value::String(SEED_MARKER_KEY.to_string())
    }

    /// The `_meta` row for this marker
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert(META_KEY_FIELD.to_string(), Self::key());
        record.insert(
            "seeded_at".to_string(),
            Value::String(self.seeded_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        record.insert("record_count".to_string(), Value::from(self.record_count));
        record.insert("schema_version".to_string(), Value::from(self.schema_version));
        record
    }

    /// Parses a `_meta` row. `None` if the row is not a well-formed marker.
    pub fn from_record(record: &Record) -> Option<Self> {
        serde_json::from_value(Value::Object(record.clone())).ok()
    }
}
