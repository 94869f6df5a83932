//! # calcgraph
//!
//! A declarative calculation graph: a store of named cells whose values are
//! either supplied directly or derived from formulas over other cells.
//!
//! ## Features
//!
//! - Constant, input and formula cells addressed as `"Sheet!A1"` or `"A1"`
//! - Restricted formula language: arithmetic, comparisons, `IF`, `SUM`,
//!   `MAX`, `MIN`, `ABS`, `ROUND`
//! - Lazy evaluation with memoization; writes invalidate every dependent
//! - Bulk recalculation in dependency order with per-cell errors
//!
//! ## Example
//!
//! ```rust
//! use calcgraph::prelude::*;
//!
//! let mut engine = CalculationEngine::new();
//! engine.define_input("Feed!A1", 100.0).unwrap();
//! engine.define_constant("Feed!A2", 0.35).unwrap();
//! engine.define_formula("Yield!B1", "=ROUND(Feed!A1*Feed!A2, 1)").unwrap();
//! engine.define_formula("Yield!B2", "=IF(B1>30, B1, 0)").unwrap();
//!
//! let recalc = engine.recalculate_all();
//! assert!(recalc.is_ok());
//! assert_eq!(recalc.value("Yield!B2"), Some(CellValue::Number(35.0)));
//! ```

pub mod engine;
pub mod prelude;
mod store;

pub use engine::{
    CalculationEngine, CalculationOptions, CalculationStats, CellContent, Recalculation,
};
pub use store::Cell;

// Re-export core types
pub use calcgraph_core::{CellAddress, CellKind, CellValue, Error, Result};

// Re-export formula types
pub use calcgraph_formula::{
    evaluate, extract_dependencies, parse_formula, EvaluationContext, FormulaError, FormulaExpr,
    FormulaResult, FunctionRegistry,
};
