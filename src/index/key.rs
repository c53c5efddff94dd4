//! Normalized key values
//!
//! Primary keys and secondary index entries are stored as `IndexKey`, a
//! totally ordered projection of scalar JSON values.
//! Ordering is deterministic: Bool < Int < Float < String < Tuple.

use serde_json::Value;

use crate::schema::{KeyPath, Record};

/// Index key representing one scalar value or an ordered tuple of them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Boolean value (false < true)
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value (stored as order-preserving bits)
    Float(u64),
    /// String value
    String(String),
    /// Composite key, one element per key field
    Tuple(Vec<IndexKey>),
}

impl IndexKey {
    /// Create a key from a float.
    ///
    /// Uses a bit transform so that the natural `u64` order matches the
    /// numeric order.
    pub fn from_float(v: f64) -> Self {
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        IndexKey::Float(ordered)
    }

    /// Create a key from a scalar JSON value.
    ///
    /// Null, arrays and objects are not indexable and yield `None`.
    pub fn from_scalar(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(IndexKey::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(IndexKey::Int(i))
                } else {
                    n.as_f64().map(IndexKey::from_float)
                }
            }
            Value::String(s) => Some(IndexKey::String(s.clone())),
            _ => None,
        }
    }

    /// Extracts the key for `path` from a record.
    ///
    /// Returns `None` if any key field is missing or not a scalar.
    pub fn extract(path: &KeyPath, record: &Record) -> Option<Self> {
        match path {
            KeyPath::Single(field) => record.get(field).and_then(Self::from_scalar),
            KeyPath::Composite(fields) => fields
                .iter()
                .map(|f| record.get(f).and_then(Self::from_scalar))
                .collect::<Option<Vec<_>>>()
                .map(IndexKey::Tuple),
        }
    }

    /// Builds the key for `path` from a caller-supplied lookup value: a
    /// scalar for a single-field key, an array in key-field order for a
    /// composite key.
    pub fn from_lookup(path: &KeyPath, value: &Value) -> Option<Self> {
        match path {
            KeyPath::Single(_) => Self::from_scalar(value),
            KeyPath::Composite(fields) => {
                let parts = value.as_array()?;
                if parts.len() != fields.len() {
                    return None;
                }
                parts
                    .iter()
                    .map(Self::from_scalar)
                    .collect::<Option<Vec<_>>>()
                    .map(IndexKey::Tuple)
            }
        }
    }

    /// The lookup value that maps back onto this key for `path`.
    pub fn to_lookup(&self) -> Value {
        match self {
            IndexKey::Bool(b) => Value::Bool(*b),
            IndexKey::Int(i) => Value::from(*i),
            IndexKey::Float(bits) => {
                let bits = *bits;
                let raw = if (bits >> 63) == 1 {
                    bits ^ (1 << 63)
                } else {
                    !bits
                };
                Value::from(f64::from_bits(raw))
            }
            IndexKey::String(s) => Value::String(s.clone()),
            IndexKey::Tuple(parts) => Value::Array(parts.iter().map(Self::to_lookup).collect()),
        }
    }
}

impl std::fmt::Display for IndexKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lookup())
    }
}
