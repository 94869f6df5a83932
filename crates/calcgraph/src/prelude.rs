//! Prelude module - common imports for calcgraph users
//!
//! ```rust
//! use calcgraph::prelude::*;
//! ```

pub use crate::{
    // Engine types
    CalculationEngine,
    CalculationOptions,
    CalculationStats,
    CellContent,
    Recalculation,

    // Cell types
    CellAddress,
    CellKind,
    CellValue,

    // Error types
    Error,
    FormulaError,
    Result,
};
