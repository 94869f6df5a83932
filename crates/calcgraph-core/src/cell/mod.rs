//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellAddress`] - A cell's identity (e.g., "Sheet1!A1")
//! - [`CellValue`] - The value stored in a cell
//! - [`CellKind`] - How a cell obtains its value

mod address;
mod kind;
mod value;

pub use address::{is_cell_name, CellAddress};
pub use kind::CellKind;
pub use value::CellValue;
