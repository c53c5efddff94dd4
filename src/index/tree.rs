//! BTreeMap-based secondary index
//!
//! Maps an indexed value to the set of primary keys holding it. Primary keys
//! per value are kept sorted so lookups are deterministic.

use std::collections::{BTreeMap, BTreeSet};

use super::key::IndexKey;

/// A single secondary index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexTree {
    tree: BTreeMap<IndexKey, BTreeSet<IndexKey>>,
}

impl IndexTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `primary_key` holds `key`.
    pub fn insert(&mut self, key: IndexKey, primary_key: IndexKey) {
        self.tree.entry(key).or_default().insert(primary_key);
    }

    /// Removes one holder of `key`; drops the entry when it was the last.
    pub fn remove(&mut self, key: &IndexKey, primary_key: &IndexKey) {
        if let Some(holders) = self.tree.get_mut(key) {
            holders.remove(primary_key);
            if holders.is_empty() {
                self.tree.remove(key);
            }
        }
    }

    /// Primary keys holding `key`, ascending.
    pub fn lookup_eq(&self, key: &IndexKey) -> Vec<IndexKey> {
        self.tree
            .get(key)
            .map(|holders| holders.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Any holder of `key` other than `primary_key`.
    ///
    /// Used for unique enforcement: a replacement of the same record never
    /// conflicts with itself.
    pub fn other_holder(&self, key: &IndexKey, primary_key: &IndexKey) -> Option<&IndexKey> {
        self.tree
            .get(key)
            .and_then(|holders| holders.iter().find(|pk| *pk != primary_key))
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Number of distinct indexed values
    pub fn distinct_keys(&self) -> usize {
        self.tree.len()
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.tree.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> IndexKey {
        IndexKey::String(v.to_string())
    }

    #[test]
    fn test_insert_and_lookup_sorted() {
        let mut tree = IndexTree::new();
        tree.insert(s("open"), s("r3"));
        tree.insert(s("open"), s("r1"));
        tree.insert(s("closed"), s("r2"));

        assert_eq!(tree.lookup_eq(&s("open")), vec![s("r1"), s("r3")]);
        assert_eq!(tree.lookup_eq(&s("closed")), vec![s("r2")]);
        assert!(tree.lookup_eq(&s("draft")).is_empty());
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.distinct_keys(), 2);
    }

    #[test]
    fn test_remove_last_holder_drops_key() {
        let mut tree = IndexTree::new();
        tree.insert(s("open"), s("r1"));
        tree.remove(&s("open"), &s("r1"));
        assert!(tree.is_empty());

        // removing something absent is a no-op
        tree.remove(&s("open"), &s("r1"));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_other_holder() {
        let mut tree = IndexTree::new();
        tree.insert(s("ACME"), s("t1"));

        assert!(tree.other_holder(&s("ACME"), &s("t1")).is_none());
        assert_eq!(tree.other_holder(&s("ACME"), &s("t2")), Some(&s("t1")));
        assert!(tree.other_holder(&s("Globex"), &s("t2")).is_none());
    }
}
