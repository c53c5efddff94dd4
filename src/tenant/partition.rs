//! Tenant partitions
//!
//! A partition is a view of the store bound to one tenant. Reads of
//! tenant-scoped collections only ever return that tenant's records; global
//! collections read through unchanged.

use serde_json::Value;

use crate::engine::{Store, StoreError, StoreResult};
use crate::schema::{Record, Scope, TENANT_FIELD, TENANT_INDEX};

/// Whether `record` carries `tenant_id`
pub(crate) fn belongs_to(record: &Record, tenant_id: &str) -> bool {
    record.get(TENANT_FIELD).and_then(Value::as_str) == Some(tenant_id)
}

impl Store {
    /// Records of `collection` visible to `tenant_id`: all records of a
    /// global collection, only the tenant's own records of a tenant-scoped
    /// one.
    pub fn get_all_for_tenant(&self, collection: &str, tenant_id: &str) -> StoreResult<Vec<Record>> {
        match self.catalog().scope_of(collection) {
            None => Err(StoreError::UnknownCollection(collection.to_string())),
            Some(Scope::Global) => self.get_all(collection),
            Some(Scope::Tenant) => self.get_by_index(
                collection,
                TENANT_INDEX,
                &Value::String(tenant_id.to_string()),
            ),
        }
    }

    /// View of the store acting as `tenant_id`
    pub fn partition(&self, tenant_id: impl Into<String>) -> TenantPartition<'_> {
        TenantPartition {
            store: self,
            tenant_id: tenant_id.into(),
        }
    }
}

/// Store operations on behalf of one tenant.
pub struct TenantPartition<'s> {
    store: &'s Store,
    tenant_id: String,
}

impl<'s> TenantPartition<'s> {
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn store(&self) -> &'s Store {
        self.store
    }

    fn is_tenant_scoped(&self, collection: &str) -> StoreResult<bool> {
        self.store
            .catalog()
            .scope_of(collection)
            .map(|scope| scope == Scope::Tenant)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))
    }

    /// Record under `key`; `None` if it belongs to another tenant.
    pub fn get(&self, collection: &str, key: &Value) -> StoreResult<Option<Record>> {
        let scoped = self.is_tenant_scoped(collection)?;
        let record = self.store.get(collection, key)?;
        Ok(record.filter(|r| !scoped || belongs_to(r, &self.tenant_id)))
    }

    pub fn get_all(&self, collection: &str) -> StoreResult<Vec<Record>> {
        self.store.get_all_for_tenant(collection, &self.tenant_id)
    }

    /// Same as [`Store::get_all_for_tenant`], for any tenant.
    pub fn get_all_for_tenant(&self, collection: &str, tenant_id: &str) -> StoreResult<Vec<Record>> {
        self.store.get_all_for_tenant(collection, tenant_id)
    }

    /// Upsert; a missing `tenant_id` is stamped or rejected per policy.
    /// Fails with `TenantMismatch` if the key holds another tenant's record.
    pub fn put(&self, collection: &str, record: Record) -> StoreResult<()> {
        self.store.put_as(collection, record, Some(&self.tenant_id))
    }

    /// Insert-only; a missing `tenant_id` is stamped or rejected per policy.
    pub fn add(&self, collection: &str, record: Record) -> StoreResult<Record> {
        self.store.add_as(collection, record, Some(&self.tenant_id))
    }

    /// Deletes the record under `key` unless it belongs to another tenant.
    pub fn delete(&self, collection: &str, key: &Value) -> StoreResult<()> {
        self.store.delete_owned(collection, key, Some(&self.tenant_id))
    }

    /// Records visible to this tenant
    pub fn count(&self, collection: &str) -> StoreResult<usize> {
        if self.is_tenant_scoped(collection)? {
            Ok(self.get_all(collection)?.len())
        } else {
            self.store.count(collection)
        }
    }
}
