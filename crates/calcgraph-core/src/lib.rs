//! # calcgraph-core
//!
//! Core value types for the calcgraph calculation engine.
//!
//! This crate provides the fundamental types shared by the formula crate and
//! the engine:
//! - [`CellAddress`] - The identity of a cell (`"Sheet!A1"` or `"A1"`)
//! - [`CellValue`] - A cell's value (number, boolean or empty)
//! - [`CellKind`] - Whether a cell is a constant, an input or a formula
//!
//! ## Example
//!
//! ```rust
//! use calcgraph_core::{CellAddress, CellValue};
//!
//! let addr = CellAddress::new("Inputs!B2").unwrap();
//! assert_eq!(addr.sheet(), Some("Inputs"));
//! assert_eq!(addr.cell_name(), "B2");
//!
//! assert_eq!(CellValue::from(2.5).to_number(), 2.5);
//! assert_eq!(CellValue::Empty.to_number(), 0.0);
//! ```

pub mod cell;
pub mod error;

// Re-exports for convenience
pub use cell::{is_cell_name, CellAddress, CellKind, CellValue};
pub use error::{Error, Result};

/// Separator between a sheet name and a cell name in an address
pub const SHEET_SEPARATOR: char = '!';
