//! Monotone boolean joined with logical OR. Once true, never false again.

use crate::lattice::{Lattice, LatticeKind};
use crate::relation::Relation;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LBool {
    value: bool,
}

impl LBool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> bool {
        self.value
    }
}

impl From<bool> for LBool {
    fn from(value: bool) -> Self {
        Self { value }
    }
}

impl Lattice for LBool {
    fn join(&self, other: &Self) -> Self {
        Self {
            value: self.value || other.value,
        }
    }

    fn merge(&mut self, other: &Self) -> bool {
        self.add(other.value)
    }
}

impl Relation for LBool {
    type Tuple = bool;
    const KIND: LatticeKind = LatticeKind::Bool;

    fn bottom() -> Self {
        Self::default()
    }

    /// Changed means the value flipped from false to true.
    fn add(&mut self, tuple: bool) -> bool {
        let old = self.value;
        self.value = old || tuple;
        self.value != old
    }

    fn tuples(&self) -> Vec<bool> {
        vec![self.value]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_signal() {
        let mut b = LBool::new();
        assert!(!b.add(false));
        assert!(b.add(true));
        assert!(!b.add(true));
        assert!(!b.add(false));
        assert!(b.value());
    }

    #[test]
    fn test_never_reverts() {
        let mut b = LBool::from(true);
        assert!(!b.merge(&LBool::from(false)));
        assert!(b.value());
    }

    #[test]
    fn test_join_is_or() {
        let t = LBool::from(true);
        let f = LBool::from(false);
        assert_eq!(t.join(&f), t);
        assert_eq!(f.join(&f), f);
        assert!(f.leq(&t));
        assert!(!t.leq(&f));
    }
}
