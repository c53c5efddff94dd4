//! What to do with a tenant-scoped write that carries no tenant id

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{StoreError, StoreResult};
use crate::schema::{Record, TENANT_FIELD};

/// Handling of records written to tenant-scoped collections without a
/// `tenant_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantPolicy {
    /// Fail with `TenantRequired`
    #[default]
    Reject,
    /// Write the acting tenant's id into the record. Without an acting
    /// tenant (plain store writes) this behaves like `Reject`.
    Stamp,
}

impl TenantPolicy {
    /// Returns the tenant id `record` will be stored under, stamping it
    /// first when the policy allows.
    ///
    /// A populated string `tenant_id` always passes through unchanged.
    pub fn resolve(
        &self,
        collection: &str,
        record: &mut Record,
        acting_tenant: Option<&str>,
    ) -> StoreResult<String> {
        match record.get(TENANT_FIELD) {
            Some(Value::String(tenant_id)) => return Ok(tenant_id.clone()),
            None | Some(Value::Null) => {}
            Some(_) => {
                return Err(StoreError::TenantRequired {
                    collection: collection.to_string(),
                })
            }
        }

        match (self, acting_tenant) {
            (TenantPolicy::Stamp, Some(tenant_id)) => {
                record.insert(TENANT_FIELD.to_string(), Value::String(tenant_id.to_string()));
                Ok(tenant_id.to_string())
            }
            _ => Err(StoreError::TenantRequired {
                collection: collection.to_string(),
            }),
        }
    }
}
