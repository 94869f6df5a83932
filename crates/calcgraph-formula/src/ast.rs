//! Formula Abstract Syntax Tree types

use calcgraph_core::CellAddress;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// Boolean literal
    Boolean(bool),

    // === References ===
    /// Single cell reference
    CellRef(CellReference),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Left-associative run of operators of one precedence level,
    /// `first op1 x1 op2 x2 ...`, applied left to right
    Chain {
        first: Box<FormulaExpr>,
        rest: Vec<(BinaryOperator, FormulaExpr)>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    /// `IF(condition, then, else)`; only the selected branch is evaluated
    Conditional {
        condition: Box<FormulaExpr>,
        then_branch: Box<FormulaExpr>,
        else_branch: Box<FormulaExpr>,
    },

    // === Function call ===
    Function {
        name: String,
        args: Vec<FormulaExpr>,
    },
}

/// Cell reference with optional sheet, as written in the formula
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellReference {
    /// Sheet name, without quotes
    pub sheet: Option<String>,
    /// Column letters and row digits (e.g. "B12")
    pub cell: String,
}

impl CellReference {
    /// Create a new reference
    pub fn new(sheet: Option<String>, cell: impl Into<String>) -> Self {
        Self {
            sheet,
            cell: cell.into(),
        }
    }

    /// Resolve to a full address. A bare reference lives on `owner_sheet`,
    /// the sheet of the cell whose formula contains it.
    pub fn resolve(&self, owner_sheet: Option<&str>) -> CellAddress {
        CellAddress::qualify(self.sheet.as_deref().or(owner_sheet), &self.cell)
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl BinaryOperator {
    /// Whether the operator yields a boolean
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterEqual
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
}
