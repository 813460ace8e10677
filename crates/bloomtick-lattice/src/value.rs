//! Dynamically typed lattice values
//!
//! `LatticeValue` is a tagged union over the fixed set of relation variants.
//! It is what protocols store when the lattice type of a value is only known
//! at runtime, e.g. a key/value store whose clients put sets under one key
//! and counters under another.
//!
//! Joining two values of the same variant delegates to that variant's join.
//! Joining two different variants has no meaning: [`LatticeValue::try_merge`]
//! reports it, and the infallible [`Lattice`] methods treat it as a broken
//! invariant and panic.

use crate::error::{LatticeError, Result};
use crate::lattice::{Lattice, LatticeKind};
use crate::lbool::LBool;
use crate::lmap::LMap;
use crate::lmax::{LMax, LMaxString};
use crate::lset::LSet;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LatticeValue {
    Set(LSet<String>),
    Map(LMap<LatticeValue>),
    MaxInt(LMax),
    MaxString(LMaxString),
    Bool(LBool),
}

impl LatticeValue {
    pub fn kind(&self) -> LatticeKind {
        match self {
            LatticeValue::Set(_) => LatticeKind::Set,
            LatticeValue::Map(_) => LatticeKind::Map,
            LatticeValue::MaxInt(_) => LatticeKind::MaxInt,
            LatticeValue::MaxString(_) => LatticeKind::MaxString,
            LatticeValue::Bool(_) => LatticeKind::Bool,
        }
    }

    /// Whether `other` can be merged into `self`: same variant, and for
    /// maps every shared key holds mergeable values.
    pub fn check_merge(&self, other: &Self) -> Result<()> {
        match (self, other) {
            (LatticeValue::Map(a), LatticeValue::Map(b)) => {
                for (key, val) in b.iter() {
                    if let Some(existing) = a.at(key) {
                        existing.check_merge(val)?;
                    }
                }
                Ok(())
            }
            (a, b) if a.kind() == b.kind() => Ok(()),
            (a, b) => Err(LatticeError::VariantMismatch {
                expected: a.kind(),
                found: b.kind(),
            }),
        }
    }

    /// Merge `other` into `self`, failing without changing `self` if any
    /// variants differ, nested map entries included.
    pub fn try_merge(&mut self, other: &Self) -> Result<bool> {
        self.check_merge(other)?;
        match (self, other) {
            (LatticeValue::Set(a), LatticeValue::Set(b)) => Ok(a.merge(b)),
            (LatticeValue::Map(a), LatticeValue::Map(b)) => Ok(a.merge(b)),
            (LatticeValue::MaxInt(a), LatticeValue::MaxInt(b)) => Ok(a.merge(b)),
            (LatticeValue::MaxString(a), LatticeValue::MaxString(b)) => Ok(a.merge(b)),
            (LatticeValue::Bool(a), LatticeValue::Bool(b)) => Ok(a.merge(b)),
            (a, b) => Err(LatticeError::VariantMismatch {
                expected: a.kind(),
                found: b.kind(),
            }),
        }
    }

    pub fn try_join(&self, other: &Self) -> Result<Self> {
        let mut joined = self.clone();
        joined.try_merge(other)?;
        Ok(joined)
    }

    pub fn as_set(&self) -> Option<&LSet<String>> {
        match self {
            LatticeValue::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&LMap<LatticeValue>> {
        match self {
            LatticeValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            LatticeValue::MaxInt(max) => Some(max.value()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LatticeValue::MaxString(max) => Some(max.value()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LatticeValue::Bool(b) => Some(b.value()),
            _ => None,
        }
    }
}

impl Lattice for LatticeValue {
    /// # Panics
    ///
    /// Panics if the two values are different variants.
    fn join(&self, other: &Self) -> Self {
        match self.try_join(other) {
            Ok(joined) => joined,
            Err(err) => panic!("lattice invariant violated: {err}"),
        }
    }

    /// # Panics
    ///
    /// Panics if the two values are different variants.
    fn merge(&mut self, other: &Self) -> bool {
        match self.try_merge(other) {
            Ok(changed) => changed,
            Err(err) => panic!("lattice invariant violated: {err}"),
        }
    }
}

impl From<LSet<String>> for LatticeValue {
    fn from(set: LSet<String>) -> Self {
        LatticeValue::Set(set)
    }
}

impl From<LMap<LatticeValue>> for LatticeValue {
    fn from(map: LMap<LatticeValue>) -> Self {
        LatticeValue::Map(map)
    }
}

impl From<LMax> for LatticeValue {
    fn from(max: LMax) -> Self {
        LatticeValue::MaxInt(max)
    }
}

impl From<LMaxString> for LatticeValue {
    fn from(max: LMaxString) -> Self {
        LatticeValue::MaxString(max)
    }
}

impl From<LBool> for LatticeValue {
    fn from(b: LBool) -> Self {
        LatticeValue::Bool(b)
    }
}
