//! Collection descriptor types
//!
//! A descriptor is compiled into the catalog and never mutated at runtime.
//! Between schema versions only new collections and new indexes may appear.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record: a self-describing map of named fields.
pub type Record = Map<String, Value>;

/// Field carrying the tenant identifier in tenant-scoped collections
pub const TENANT_FIELD: &str = "tenant_id";

/// Index every tenant-scoped collection carries over [`TENANT_FIELD`]
pub const TENANT_INDEX: &str = "tenant_id";

/// Key field eligible for generated identifiers
pub const ID_FIELD: &str = "id";

/// Reserved metadata collection holding configuration rows
pub const META_COLLECTION: &str = "_meta";

/// Key field of the metadata collection
pub const META_KEY_FIELD: &str = "key";

/// Field (or ordered field list) a key is built from.
///
/// Serialized untagged: a string for a single field, an array for a
/// composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPath {
    /// One field
    Single(String),
    /// Ordered list of fields forming a composite key
    Composite(Vec<String>),
}

impl KeyPath {
    /// Single-field key
    pub fn single(field: impl Into<String>) -> Self {
        KeyPath::Single(field.into())
    }

    /// Composite key over the given fields, in order
    pub fn composite<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyPath::Composite(fields.into_iter().map(Into::into).collect())
    }

    /// Fields making up the key, in order
    pub fn fields(&self) -> &[String] {
        match self {
            KeyPath::Single(field) => std::slice::from_ref(field),
            KeyPath::Composite(fields) => fields,
        }
    }

    /// Whether this is the single field `id`, the only shape that gets
    /// generated identifiers
    pub fn is_generated_id(&self) -> bool {
        matches!(self, KeyPath::Single(field) if field == ID_FIELD)
    }
}

impl std::fmt::Display for KeyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyPath::Single(field) => write!(f, "{}", field),
            KeyPath::Composite(fields) => write!(f, "[{}]", fields.join(", ")),
        }
    }
}

/// Secondary index definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name, unique within its collection
    pub name: String,
    /// Indexed field(s)
    pub key: KeyPath,
    /// Whether the indexed value must be unique across the collection
    #[serde(default)]
    pub unique: bool,
}

impl IndexDescriptor {
    /// Non-unique single-field index named after its field
    pub fn on(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            name: field.clone(),
            key: KeyPath::Single(field),
            unique: false,
        }
    }

    /// Non-unique index with an explicit name
    pub fn named(name: impl Into<String>, key: KeyPath) -> Self {
        Self {
            name: name.into(),
            key,
            unique: false,
        }
    }

    /// Marks the index unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Whether a collection is partitioned by tenant or shared by all tenants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Records carry `tenant_id` and are filtered by it
    Tenant,
    /// Records are visible to every tenant
    Global,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Tenant => "tenant",
            Scope::Global => "global",
        }
    }
}

/// Complete collection declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    /// Unique collection name
    pub name: String,
    /// Primary-key shape
    pub primary_key: KeyPath,
    /// Secondary indexes
    #[serde(default)]
    pub indexes: Vec<IndexDescriptor>,
    /// Tenant-scoped or global
    pub scope: Scope,
}

impl CollectionDescriptor {
    /// Global collection keyed by `primary_key`
    pub fn global(name: impl Into<String>, primary_key: KeyPath) -> Self {
        Self {
            name: name.into(),
            primary_key,
            indexes: Vec::new(),
            scope: Scope::Global,
        }
    }

    /// Tenant-scoped collection keyed by `primary_key`
    pub fn tenant(name: impl Into<String>, primary_key: KeyPath) -> Self {
        Self {
            name: name.into(),
            primary_key,
            indexes: Vec::new(),
            scope: Scope::Tenant,
        }
    }

    /// Adds a secondary index
    pub fn with_index(mut self, index: IndexDescriptor) -> Self {
        self.indexes.push(index);
        self
    }

    /// Looks up an index by name
    pub fn index(&self, name: &str) -> Option<&IndexDescriptor> {
        self.indexes.iter().find(|ix| ix.name == name)
    }

    pub fn is_tenant_scoped(&self) -> bool {
        self.scope == Scope::Tenant
    }

    /// The same collection with no secondary indexes
    pub fn without_indexes(&self) -> Self {
        Self {
            indexes: Vec::new(),
            ..self.clone()
        }
    }
}
