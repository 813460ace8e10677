//! Error types for lattice operations.

use crate::lattice::LatticeKind;
use thiserror::Error;

/// Errors that can occur when combining dynamically typed lattice values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LatticeError {
    #[error("Cannot merge a {found} lattice into a {expected} lattice")]
    VariantMismatch {
        expected: LatticeKind,
        found: LatticeKind,
    },
}

pub type Result<T> = std::result::Result<T, LatticeError>;
