//! Error types for the cluster driver.

use bloomtick_runtime::RuntimeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("Node not found: {0}")]
    UnknownNode(String),

    #[error("Node already exists: {0}")]
    DuplicateNode(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, SimError>;
