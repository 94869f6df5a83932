//! Formula evaluator
//!
//! Evaluates formula ASTs to produce values. The only capabilities available
//! to a formula are cell lookups through [`CellLookup`], the arithmetic and
//! comparison operators, and the functions of a [`FunctionRegistry`].

use crate::ast::{BinaryOperator, CellReference, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FunctionRegistry;
use calcgraph_core::{CellAddress, CellValue};

/// Source of cell values during evaluation
pub trait CellLookup {
    /// Current value of the cell at `address`; [`CellValue::Empty`] if unknown
    fn value(&self, address: &CellAddress) -> CellValue;
}

/// Lookup with no cells at all, for evaluating constant expressions
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyLookup;

impl CellLookup for EmptyLookup {
    fn value(&self, _address: &CellAddress) -> CellValue {
        CellValue::Empty
    }
}

/// Context for formula evaluation
pub struct EvaluationContext<'a> {
    /// Cell values visible to the formula
    pub cells: &'a dyn CellLookup,
    /// Sheet of the cell being evaluated (for bare references)
    pub current_sheet: Option<&'a str>,
    /// Functions the formula may call
    pub functions: &'a FunctionRegistry,
}

impl<'a> EvaluationContext<'a> {
    /// Create a new evaluation context
    pub fn new(
        cells: &'a dyn CellLookup,
        current_sheet: Option<&'a str>,
        functions: &'a FunctionRegistry,
    ) -> Self {
        Self {
            cells,
            current_sheet,
            functions,
        }
    }

    /// Get a cell value; missing and empty cells read as zero
    pub fn get_cell_value(&self, reference: &CellReference) -> CellValue {
        match self.cells.value(&reference.resolve(self.current_sheet)) {
            CellValue::Empty => CellValue::Number(0.0),
            value => value,
        }
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<CellValue> {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => Ok(CellValue::Number(*n)),
        FormulaExpr::Boolean(b) => Ok(CellValue::Boolean(*b)),

        // === References ===
        FormulaExpr::CellRef(cell_ref) => Ok(ctx.get_cell_value(cell_ref)),

        // === Operators ===
        FormulaExpr::BinaryOp { op, left, right } => {
            let l = evaluate(left, ctx)?.to_number();
            let r = evaluate(right, ctx)?.to_number();
            apply_binary_op(*op, l, r)
        }

        FormulaExpr::Chain { first, rest } => {
            let mut acc = evaluate(first, ctx)?;
            for (op, operand) in rest {
                let r = evaluate(operand, ctx)?.to_number();
                acc = apply_binary_op(*op, acc.to_number(), r)?;
            }
            Ok(acc)
        }

        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        FormulaExpr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => {
            if evaluate(condition, ctx)?.is_truthy() {
                evaluate(then_branch, ctx)
            } else {
                evaluate(else_branch, ctx)
            }
        }

        // === Functions ===
        FormulaExpr::Function { name, args } => evaluate_function(name, args, ctx),
    }
}

/// Apply a binary operator to two numbers
fn apply_binary_op(op: BinaryOperator, l: f64, r: f64) -> FormulaResult<CellValue> {
    let result = match op {
        // Arithmetic operators
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => {
            if r == 0.0 {
                return Err(FormulaError::Evaluation("Division by zero".into()));
            }
            l / r
        }
        BinaryOperator::Power => l.powf(r),

        // Comparison operators
        BinaryOperator::Equal => return Ok(CellValue::Boolean(l == r)),
        BinaryOperator::NotEqual => return Ok(CellValue::Boolean(l != r)),
        BinaryOperator::LessThan => return Ok(CellValue::Boolean(l < r)),
        BinaryOperator::LessEqual => return Ok(CellValue::Boolean(l <= r)),
        BinaryOperator::GreaterThan => return Ok(CellValue::Boolean(l > r)),
        BinaryOperator::GreaterEqual => return Ok(CellValue::Boolean(l >= r)),
    };

    finite(result)
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<CellValue> {
    let n = evaluate(operand, ctx)?.to_number();

    match op {
        UnaryOperator::Negate => Ok(CellValue::Number(-n)),
    }
}

/// Evaluate a function call
fn evaluate_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> FormulaResult<CellValue> {
    let func = ctx
        .functions
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    // Check argument count
    if args.len() < func.min_args {
        return Err(FormulaError::ArgumentCount {
            function: name.to_string(),
            expected: format!("at least {}", func.min_args),
            actual: args.len(),
        });
    }

    if let Some(max) = func.max_args {
        if args.len() > max {
            return Err(FormulaError::ArgumentCount {
                function: name.to_string(),
                expected: format!("at most {}", max),
                actual: args.len(),
            });
        }
    }

    // Evaluate arguments
    let mut evaluated_args = Vec::with_capacity(args.len());
    for arg in args {
        evaluated_args.push(evaluate(arg, ctx)?);
    }

    // Call the function
    match (func.implementation)(&evaluated_args)? {
        CellValue::Number(n) => finite(n),
        value => Ok(value),
    }
}

fn finite(n: f64) -> FormulaResult<CellValue> {
    if n.is_finite() {
        Ok(CellValue::Number(n))
    } else {
        Err(FormulaError::Evaluation(format!(
            "Result is not a finite number ({})",
            n
        )))
    }
}
