//! Grow-only set relation - tuples can only be added, never removed
//!
//! Deduplication is structural: two tuples are the same fact when their
//! fields compare equal, which is why tuple types derive `Ord`.

use crate::lattice::{Lattice, LatticeKind};
use crate::relation::Relation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Debug;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LSet<T: Ord + Clone> {
    elements: BTreeSet<T>,
}

impl<T: Ord + Clone> LSet<T> {
    pub fn new() -> Self {
        Self {
            elements: BTreeSet::new(),
        }
    }

    /// A set holding exactly one tuple, handy as a map entry value.
    pub fn one(value: T) -> Self {
        let mut set = Self::new();
        set.insert(value);
        set
    }

    /// Add an element (the only mutation allowed)
    pub fn insert(&mut self, value: T) -> bool {
        self.elements.insert(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.elements.contains(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<T: Ord + Clone> Default for LSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone> FromIterator<T> for LSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<T: Ord + Clone> Lattice for LSet<T> {
    fn join(&self, other: &Self) -> Self {
        Self {
            elements: self.elements.union(&other.elements).cloned().collect(),
        }
    }

    fn merge(&mut self, other: &Self) -> bool {
        let before = self.elements.len();
        self.elements.extend(other.elements.iter().cloned());
        self.elements.len() != before
    }
}

impl<T: Ord + Clone + Debug + 'static> Relation for LSet<T> {
    type Tuple = T;
    const KIND: LatticeKind = LatticeKind::Set;

    fn bottom() -> Self {
        Self::new()
    }

    fn add(&mut self, tuple: T) -> bool {
        self.insert(tuple)
    }

    fn tuples(&self) -> Vec<T> {
        self.elements.iter().cloned().collect()
    }
}
