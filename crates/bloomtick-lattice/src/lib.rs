//! # bloomtick-lattice
//!
//! Mergeable value types for the bloomtick runtime.
//!
//! Every relation a program declares is one of five lattice variants:
//!
//! | variant | value | join |
//! |---|---|---|
//! | [`LSet<T>`] | set of tuples | union |
//! | [`LMap<V>`] | string key to inner lattice | pointwise join |
//! | [`LMax`] | integer | max |
//! | [`LMaxString`] | string | lexicographic max |
//! | [`LBool`] | boolean | or |
//!
//! The [`Relation`] trait is the contract the scheduler relies on: add a
//! fact, merge a whole relation, list the current tuples, snapshot, reset.
//! [`LatticeValue`] is the tagged union of the same five variants for values
//! whose lattice type is chosen at runtime.

pub mod error;
pub mod lattice;
pub mod lbool;
pub mod lmap;
pub mod lmax;
pub mod lset;
pub mod relation;
pub mod value;

pub use error::{LatticeError, Result};
pub use lattice::{Lattice, LatticeKind};
pub use lbool::LBool;
pub use lmap::{LMap, MapEntry};
pub use lmax::{LMax, LMaxString};
pub use lset::LSet;
pub use relation::Relation;
pub use value::LatticeValue;
