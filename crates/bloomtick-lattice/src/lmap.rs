//! Map of lattices - string keys to nested lattice values
//!
//! Adding an entry whose key already exists merges the new value into the
//! old one with the inner lattice's join, so a map of any lattice is itself
//! a lattice under pointwise join.

use crate::lattice::{Lattice, LatticeKind};
use crate::relation::Relation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// One key/value pair; the tuple type of an [`LMap`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MapEntry<V> {
    pub key: String,
    pub val: V,
}

impl<V> MapEntry<V> {
    pub fn new(key: impl Into<String>, val: V) -> Self {
        Self {
            key: key.into(),
            val,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LMap<V: Lattice> {
    entries: BTreeMap<String, V>,
}

impl<V: Lattice> LMap<V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Merge `val` into the entry at `key`, inserting it if absent.
    pub fn insert(&mut self, key: impl Into<String>, val: V) -> bool {
        let key = key.into();
        match self.entries.get_mut(&key) {
            Some(existing) => existing.merge(&val),
            None => {
                self.entries.insert(key, val);
                true
            }
        }
    }

    /// The value stored at `key`, if any.
    pub fn at(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Lattice> Default for LMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Lattice> FromIterator<(String, V)> for LMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, val) in iter {
            map.insert(key, val);
        }
        map
    }
}

impl<V: Lattice> Lattice for LMap<V> {
    /// Pointwise join; keys present on one side only are carried over
    fn join(&self, other: &Self) -> Self {
        let mut joined = self.clone();
        joined.merge(other);
        joined
    }

    fn merge(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (key, val) in &other.entries {
            changed |= self.insert(key.clone(), val.clone());
        }
        changed
    }
}

impl<V: Lattice + Debug + 'static> Relation for LMap<V> {
    type Tuple = MapEntry<V>;
    const KIND: LatticeKind = LatticeKind::Map;

    fn bottom() -> Self {
        Self::new()
    }

    fn add(&mut self, tuple: MapEntry<V>) -> bool {
        self.insert(tuple.key, tuple.val)
    }

    fn tuples(&self) -> Vec<MapEntry<V>> {
        self.entries
            .iter()
            .map(|(key, val)| MapEntry::new(key.clone(), val.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lbool::LBool;
    use crate::lset::LSet;

    #[test]
    fn test_add_merges_existing_entry() {
        let mut map: LMap<LSet<String>> = LMap::new();
        assert!(map.add(MapEntry::new("A", LSet::one("a0".to_string()))));
        assert!(!map.add(MapEntry::new("A", LSet::one("a0".to_string()))));
        assert!(map.add(MapEntry::new("A", LSet::one("a1".to_string()))));
        assert_eq!(map.at("A").map(LSet::len), Some(2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_pointwise_join() {
        let mut a: LMap<LBool> = LMap::new();
        a.insert("x", LBool::from(false));
        a.insert("y", LBool::from(true));

        let mut b: LMap<LBool> = LMap::new();
        b.insert("x", LBool::from(true));
        b.insert("z", LBool::from(false));

        let joined = a.join(&b);
        assert_eq!(joined.at("x"), Some(&LBool::from(true)));
        assert_eq!(joined.at("y"), Some(&LBool::from(true)));
        assert_eq!(joined.at("z"), Some(&LBool::from(false)));
        assert_eq!(joined, b.join(&a));
    }

    #[test]
    fn test_snapshot_is_deep() {
        let mut map: LMap<LSet<i32>> = LMap::new();
        map.insert("k", LSet::one(1));
        let snap = map.snapshot();
        map.insert("k", LSet::one(2));
        assert_eq!(snap.at("k").map(LSet::len), Some(1));
        assert_eq!(map.at("k").map(LSet::len), Some(2));
    }

    #[test]
    fn test_scratch_reset_clears_entries() {
        let mut map: LMap<LBool> = LMap::new();
        map.insert("k", LBool::from(true));
        map.reset();
        assert!(map.is_empty());
    }

    #[test]
    fn test_tuples_are_entries() {
        let map: LMap<LSet<i32>> = vec![
            ("b".to_string(), LSet::one(2)),
            ("a".to_string(), LSet::one(1)),
        ]
        .into_iter()
        .collect();

        let keys: Vec<_> = map.tuples().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_map_serialization() {
        let mut map: LMap<LSet<String>> = LMap::new();
        map.insert("k", LSet::one("v".to_string()));

        let serialized = serde_json::to_string(&map).unwrap();
        let deserialized: LMap<LSet<String>> = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, map);
    }
}
