//! Formula parser
//!
//! A recursive descent parser for the restricted formula grammar with proper
//! operator precedence.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::tokenizer::{Token, Tokenizer};

/// Name of the conditional, which the parser turns into [`FormulaExpr::Conditional`]
pub const CONDITIONAL_FUNCTION: &str = "IF";

/// Deepest nesting of parentheses, function calls and prefix or `^`
/// operators a formula may use
pub const MAX_NESTING_DEPTH: usize = 64;

/// Parse a formula string into an AST
///
/// # Example
/// ```rust
/// use calcgraph_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1,'Inputs'!B2)").unwrap();
/// let ast = parse_formula("=IF(A1>0,1,0)").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let formula = formula.trim();

    // Formula must start with '='
    let formula = formula
        .strip_prefix('=')
        .ok_or_else(|| FormulaError::Parse("Formula must start with '='".into()))?;

    let mut parser = FormulaParser::new(formula);
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if !matches!(parser.current_token(), Token::Eof) {
        return Err(FormulaError::Parse(format!(
            "Unexpected {} after expression",
            describe(parser.current_token())
        )));
    }

    Ok(expr)
}

/// Formula parser
struct FormulaParser<'a> {
    tokens: Tokenizer<'a>,
    current_token: Token,
    depth: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> Self {
        let mut tokens = Tokenizer::new(input);
        let current_token = tokens.next_token();
        Self {
            tokens,
            current_token,
            depth: 0,
        }
    }

    // === Token helpers ===

    fn current_token(&self) -> &Token {
        &self.current_token
    }

    fn consume(&mut self) -> Token {
        let next = self.tokens.next_token();
        std::mem::replace(&mut self.current_token, next)
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {}, got {}",
                describe(expected),
                describe(self.current_token())
            )))
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Addition/Subtraction: +, -
    // 3. Multiplication/Division: *, /
    // 4. Exponentiation: ^
    // 5. Unary: -, +
    // 6. Primary: literals, references, function calls, parentheses

    /// Run `parse` one nesting level deeper
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> FormulaResult<T>,
    ) -> FormulaResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(FormulaError::Parse(format!(
                "Formula nested more than {} levels deep",
                MAX_NESTING_DEPTH
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.nested(Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_chain(Self::parse_additive, |token| match token {
            Token::Equal => Some(BinaryOperator::Equal),
            Token::NotEqual => Some(BinaryOperator::NotEqual),
            Token::LessThan => Some(BinaryOperator::LessThan),
            Token::LessEqual => Some(BinaryOperator::LessEqual),
            Token::GreaterThan => Some(BinaryOperator::GreaterThan),
            Token::GreaterEqual => Some(BinaryOperator::GreaterEqual),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_chain(Self::parse_multiplicative, |token| match token {
            Token::Plus => Some(BinaryOperator::Add),
            Token::Minus => Some(BinaryOperator::Subtract),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_chain(Self::parse_exponent, |token| match token {
            Token::Star => Some(BinaryOperator::Multiply),
            Token::Slash => Some(BinaryOperator::Divide),
            _ => None,
        })
    }

    /// Parse `operand (op operand)*` for one left-associative level
    ///
    /// Long runs become a single [`FormulaExpr::Chain`] so the tree only
    /// grows deeper with nesting.
    fn parse_chain(
        &mut self,
        operand: fn(&mut Self) -> FormulaResult<FormulaExpr>,
        operator: fn(&Token) -> Option<BinaryOperator>,
    ) -> FormulaResult<FormulaExpr> {
        let first = operand(self)?;
        let mut rest = Vec::new();

        while let Some(op) = operator(self.current_token()) {
            self.consume();
            rest.push((op, operand(self)?));
        }

        Ok(match rest.len() {
            0 => first,
            1 => {
                let (op, right) = rest.remove(0);
                FormulaExpr::BinaryOp {
                    op,
                    left: Box::new(first),
                    right: Box::new(right),
                }
            }
            _ => FormulaExpr::Chain {
                first: Box::new(first),
                rest,
            },
        })
    }

    fn parse_exponent(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_unary()?;

        if matches!(self.current_token(), Token::Caret) {
            self.consume();
            let right = self.nested(Self::parse_exponent)?; // Right associative
            return Ok(FormulaExpr::BinaryOp {
                op: BinaryOperator::Power,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        // Prefix unary minus
        if matches!(self.current_token(), Token::Minus) {
            self.consume();
            let operand = self.nested(Self::parse_unary)?;
            return Ok(FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }

        // Prefix plus (no-op)
        if matches!(self.current_token(), Token::Plus) {
            self.consume();
            return self.nested(Self::parse_unary);
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.consume() {
            Token::Number(n) => Ok(FormulaExpr::Number(n)),

            Token::Boolean(b) => Ok(FormulaExpr::Boolean(b)),

            Token::Reference(reference) => Ok(FormulaExpr::CellRef(reference)),

            Token::LeftParen => {
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::Identifier(name) => {
                // Only function calls may be named; there are no defined names
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Err(FormulaError::Parse(format!("Unknown name '{}'", name)))
                }
            }

            Token::Invalid(message) => Err(FormulaError::Parse(message)),

            other => Err(FormulaError::Parse(format!(
                "Unexpected {}",
                describe(&other)
            ))),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        // Parse arguments
        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_expression()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RightParen)?;

        let name = name.to_ascii_uppercase();
        if name == CONDITIONAL_FUNCTION {
            return conditional(args);
        }

        Ok(FormulaExpr::Function { name, args })
    }
}

fn conditional(args: Vec<FormulaExpr>) -> FormulaResult<FormulaExpr> {
    let actual = args.len();
    let mut args = args.into_iter();
    match (args.next(), args.next(), args.next(), args.next()) {
        (Some(condition), Some(then_branch), Some(else_branch), None) => {
            Ok(FormulaExpr::Conditional {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            })
        }
        _ => Err(FormulaError::ArgumentCount {
            function: CONDITIONAL_FUNCTION.into(),
            expected: "3".into(),
            actual,
        }),
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => format!("number {}", n),
        Token::Boolean(b) => format!("boolean {}", if *b { "TRUE" } else { "FALSE" }),
        Token::Identifier(name) => format!("name '{}'", name),
        Token::Reference(r) => match &r.sheet {
            Some(sheet) => format!("reference '{}'!{}", sheet, r.cell),
            None => format!("reference {}", r.cell),
        },
        Token::Plus => "'+'".into(),
        Token::Minus => "'-'".into(),
        Token::Star => "'*'".into(),
        Token::Slash => "'/'".into(),
        Token::Caret => "'^'".into(),
        Token::Equal => "'='".into(),
        Token::NotEqual => "'<>'".into(),
        Token::LessThan => "'<'".into(),
        Token::LessEqual => "'<='".into(),
        Token::GreaterThan => "'>'".into(),
        Token::GreaterEqual => "'>='".into(),
        Token::Comma => "','".into(),
        Token::LeftParen => "'('".into(),
        Token::RightParen => "')'".into(),
        Token::Invalid(message) => message.clone(),
        Token::Eof => "end of formula".into(),
    }
}
