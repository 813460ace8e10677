//! Join-semilattice trait - the mathematical foundation of every relation
//!
//! A join-semilattice (S, ⊔) satisfies:
//! - Commutativity: a ⊔ b = b ⊔ a
//! - Associativity: (a ⊔ b) ⊔ c = a ⊔ (b ⊔ c)
//! - Idempotence:  a ⊔ a = a
//!
//! These properties are what let the tick scheduler apply derived facts
//! in any order, any number of times, and still reach the same fixpoint.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A mergeable value. Every relation variant and every value stored in a
/// map of lattices implements this.
pub trait Lattice: Clone + PartialEq {
    /// Join operation (least upper bound)
    /// Must be commutative, associative, and idempotent
    fn join(&self, other: &Self) -> Self;

    /// Join-assign in place, reporting whether `self` grew.
    ///
    /// The returned flag drives fixpoint detection, so it must be `true`
    /// exactly when the new value differs from the old one.
    fn merge(&mut self, other: &Self) -> bool {
        let joined = self.join(other);
        if joined == *self {
            false
        } else {
            *self = joined;
            true
        }
    }

    /// Partial order derived from join:  a ≤ b iff a ⊔ b = b
    fn partial_cmp_lattice(&self, other: &Self) -> Option<Ordering> {
        let joined = self.join(other);
        if &joined == self && &joined == other {
            Some(Ordering::Equal)
        } else if &joined == other {
            Some(Ordering::Less)
        } else if &joined == self {
            Some(Ordering::Greater)
        } else {
            None // Concurrent/incomparable
        }
    }

    /// Check if self ≤ other in the lattice order
    fn leq(&self, other: &Self) -> bool {
        matches!(
            self.partial_cmp_lattice(other),
            Some(Ordering::Less) | Some(Ordering::Equal)
        )
    }
}

/// The closed set of relation variants the runtime knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LatticeKind {
    Set,
    Map,
    MaxInt,
    MaxString,
    Bool,
}

impl fmt::Display for LatticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LatticeKind::Set => "set",
            LatticeKind::Map => "map",
            LatticeKind::MaxInt => "max-int",
            LatticeKind::MaxString => "max-string",
            LatticeKind::Bool => "bool",
        };
        f.write_str(name)
    }
}
