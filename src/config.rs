//! Store configuration
//!
//! Loaded from a JSON file or built in code. Every field has a default, so
//! `{}` is a valid configuration for an in-memory store.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::{StoreError, StoreResult};
use crate::observability::Severity;
use crate::tenant::TenantPolicy;

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database name; the commit log is `<data_dir>/<name>.grclog`
    #[serde(default = "default_name")]
    pub name: String,

    /// Directory holding the commit log. `None` keeps the log in memory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Schema version the catalog describes (default: 1)
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Handling of tenant-scoped writes without a tenant id
    #[serde(default)]
    pub tenant_policy: TenantPolicy,

    /// Global collection whose primary keys are the valid tenant ids
    #[serde(default)]
    pub tenant_registry: Option<String>,

    /// fsync after every commit (default: true)
    #[serde(default = "default_sync_writes")]
    pub sync_writes: bool,

    /// Rewrite the log as a single snapshot batch after opening
    #[serde(default)]
    pub compact_on_open: bool,

    /// Minimum severity written by the logger (default: INFO)
    #[serde(default)]
    pub log_level: Severity,
}

fn default_name() -> String {
    "grcstore".to_string()
}

fn default_schema_version() -> u32 {
    1
}

fn default_sync_writes() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: None,
            schema_version: default_schema_version(),
            tenant_policy: TenantPolicy::default(),
            tenant_registry: None,
            sync_writes: default_sync_writes(),
            compact_on_open: false,
            log_level: Severity::default(),
        }
    }
}

impl StoreConfig {
    /// In-memory store named `name`
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// File-backed store named `name` under `data_dir`
    pub fn on_disk(name: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            data_dir: Some(data_dir.into()),
            ..Default::default()
        }
    }

    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    pub fn with_tenant_policy(mut self, policy: TenantPolicy) -> Self {
        self.tenant_policy = policy;
        self
    }

    pub fn with_tenant_registry(mut self, collection: impl Into<String>) -> Self {
        self.tenant_registry = Some(collection.into());
        self
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: StoreConfig = serde_json::from_str(&content)
            .map_err(|e| StoreError::InvalidConfig(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects names that cannot be used as a file stem.
    pub fn validate(&self) -> StoreResult<()> {
        if self.name.is_empty() {
            return Err(StoreError::InvalidConfig("name must not be empty".into()));
        }
        if self.name.contains(['/', '\\']) || self.name == "." || self.name == ".." {
            return Err(StoreError::InvalidConfig(format!(
                "name '{}' must not contain path separators",
                self.name
            )));
        }
        if let Some(registry) = &self.tenant_registry {
            if registry.is_empty() {
                return Err(StoreError::InvalidConfig(
                    "tenant_registry must name a collection".into(),
                ));
            }
        }
        Ok(())
    }
}
