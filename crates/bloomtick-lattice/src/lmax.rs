//! Monotone scalar registers: integer max and lexicographic string max
//!
//! Both hold a single value that only ever moves up. Integer registers
//! start at zero because they mostly carry counts and thresholds.

use crate::lattice::{Lattice, LatticeKind};
use crate::relation::Relation;
use serde::{Deserialize, Serialize};

/// Integer register joined with `max`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LMax {
    value: i64,
}

impl LMax {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

impl From<i64> for LMax {
    fn from(value: i64) -> Self {
        Self { value }
    }
}

impl Lattice for LMax {
    fn join(&self, other: &Self) -> Self {
        Self {
            value: self.value.max(other.value),
        }
    }

    fn merge(&mut self, other: &Self) -> bool {
        self.add(other.value)
    }
}

impl Relation for LMax {
    type Tuple = i64;
    const KIND: LatticeKind = LatticeKind::MaxInt;

    fn bottom() -> Self {
        Self::default()
    }

    fn add(&mut self, tuple: i64) -> bool {
        if tuple > self.value {
            self.value = tuple;
            true
        } else {
            false
        }
    }

    fn tuples(&self) -> Vec<i64> {
        vec![self.value]
    }
}

/// String register joined with lexicographic `max`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LMaxString {
    value: String,
}

impl LMaxString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl From<&str> for LMaxString {
    fn from(value: &str) -> Self {
        Self {
            value: value.to_owned(),
        }
    }
}

impl From<String> for LMaxString {
    fn from(value: String) -> Self {
        Self { value }
    }
}

impl Lattice for LMaxString {
    fn join(&self, other: &Self) -> Self {
        if other.value > self.value {
            other.clone()
        } else {
            self.clone()
        }
    }

    fn merge(&mut self, other: &Self) -> bool {
        if other.value > self.value {
            self.value.clone_from(&other.value);
            true
        } else {
            false
        }
    }
}

impl Relation for LMaxString {
    type Tuple = String;
    const KIND: LatticeKind = LatticeKind::MaxString;

    fn bottom() -> Self {
        Self::default()
    }

    fn add(&mut self, tuple: String) -> bool {
        if tuple > self.value {
            self.value = tuple;
            true
        } else {
            false
        }
    }

    fn tuples(&self) -> Vec<String> {
        vec![self.value.clone()]
    }
}
