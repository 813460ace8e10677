//! The capability contract every relation variant exposes to the scheduler.

use crate::lattice::{Lattice, LatticeKind};
use std::fmt::Debug;

/// A lattice that can be declared as a named relation in a program.
///
/// `add` folds a single fact (one element of [`Relation::Tuple`]) into the
/// relation; [`Lattice::merge`] folds a whole relation of the same variant.
/// Both only ever move the value up in the variant's order.
pub trait Relation: Lattice + Debug + 'static {
    /// The element type joins read from and write into this relation.
    type Tuple: Clone + Debug + 'static;

    /// Variant tag, used for diagnostics and dynamic lookup.
    const KIND: LatticeKind;

    /// The bottom element (identity for join)
    fn bottom() -> Self;

    /// Fold one fact in. Returns `true` if the relation changed.
    fn add(&mut self, tuple: Self::Tuple) -> bool;

    /// The current elements, detached from the relation.
    fn tuples(&self) -> Vec<Self::Tuple>;

    /// A deep copy that shares nothing with `self`.
    fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Back to bottom. Only the scheduler calls this, and only for scratch
    /// relations.
    fn reset(&mut self) {
        *self = Self::bottom();
    }
}
