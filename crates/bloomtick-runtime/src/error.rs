//! Error types for program setup and evaluation.

use crate::handle::RelationId;
use thiserror::Error;

/// Errors that can occur while declaring or running a program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Relation already declared: {0}")]
    DuplicateRelation(String),

    #[error("Relation not found: {0}")]
    UnknownRelation(String),

    #[error("Type mismatch for relation {name}: expected {expected}, found {found}")]
    RelationTypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Relation {0} belongs to a different program")]
    ForeignRelation(RelationId),

    #[error("No fixpoint at {addr} in tick {tick} after {passes} passes")]
    FixpointDiverged {
        addr: String,
        tick: u64,
        passes: usize,
    },
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
