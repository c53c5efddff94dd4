//! Tenant partitioning for grcstore
//!
//! The catalog fixes which collections are tenant-scoped and which are
//! global. Tenant-scoped records carry `tenant_id` and are read back through
//! the `tenant_id` index.
//!
//! # Design Principles
//!
//! - Classification is by collection name and exhaustive
//! - Populated `tenant_id` values are never rewritten
//! - A partition never returns another tenant's records

mod partition;
mod policy;

pub(crate) use partition::belongs_to;
pub use partition::TenantPartition;
pub use policy::TenantPolicy;
