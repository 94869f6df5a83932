//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing or evaluation
///
/// All of these are per-cell diagnostics: the engine records them against the
/// failing cell and keeps calculating the rest of the graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Formula text could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Formula evaluation error (division by zero, non-finite result, ...)
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Function outside the supported set
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },
}

impl FormulaError {
    /// Whether this is a syntax error, as opposed to an evaluation error
    pub fn is_syntax(&self) -> bool {
        matches!(self, FormulaError::Parse(_))
    }
}
