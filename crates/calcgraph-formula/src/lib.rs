//! # calcgraph-formula
//!
//! Formula parser, evaluator and dependency graph for calcgraph.
//!
//! This crate provides:
//! - Formula parsing (text → AST)
//! - Formula evaluation (AST → value) over a restricted set of operators
//!   and functions
//! - Dependency extraction and the graph used to order recalculation
//!
//! ## Example
//!
//! ```rust
//! use calcgraph_formula::{evaluate, parse_formula, EmptyLookup, EvaluationContext, FunctionRegistry};
//! use calcgraph_core::CellValue;
//!
//! let ast = parse_formula("=IF(2>1, ROUND(2.345, 2), 0)").unwrap();
//! let functions = FunctionRegistry::new();
//! let ctx = EvaluationContext::new(&EmptyLookup, None, &functions);
//! assert_eq!(evaluate(&ast, &ctx).unwrap(), CellValue::Number(2.35));
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod tokenizer;

pub use ast::{BinaryOperator, CellReference, FormulaExpr, UnaryOperator};
pub use dependency::{extract_dependencies, CalculationOrder, CellId, DependencyGraph};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, CellLookup, EmptyLookup, EvaluationContext};
pub use functions::FunctionRegistry;
pub use parser::{parse_formula, MAX_NESTING_DEPTH};
