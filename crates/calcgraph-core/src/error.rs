//! Error types for calcgraph-core

use crate::cell::CellKind;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when defining or mutating cells
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Direct write attempted on a cell whose value is derived
    #[error("Cannot write to {kind} cell {address}")]
    InvalidKind { address: String, kind: CellKind },

    /// Formula cell defined without formula text
    #[error("Formula cell {0} has no formula text")]
    EmptyFormula(String),

    /// Unrecognized cell kind name
    #[error("Unknown cell kind: {0}")]
    UnknownKind(String),
}
