//! Formula tokenizer
//!
//! Splits formula text into tokens. Scanning never fails: characters and
//! constructs the grammar does not accept come out as [`Token::Invalid`] so the
//! parser can report them, while the dependency extractor can still collect
//! every well-formed reference from a malformed formula.

use crate::ast::CellReference;
use calcgraph_core::{is_cell_name, SHEET_SEPARATOR};

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    Boolean(bool),

    // Identifiers and references
    Identifier(String), // Function name, or an unknown bare word
    Reference(CellReference),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Comma,

    // Delimiters
    LeftParen,
    RightParen,

    /// Something the grammar does not accept, with a description
    Invalid(String),

    // End of input
    Eof,
}

/// Formula tokenizer
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    /// Tokenize `input`, which should not include the leading `=`
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            finished: false,
        }
    }

    /// Scan the next token, returning [`Token::Eof`] at the end
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Token::Eof,
        };

        // Single-character tokens
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return token;
        }

        // Two-character operators
        if c == '<' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Token::LessEqual;
            } else if self.peek_char() == Some('>') {
                self.advance();
                return Token::NotEqual;
            }
            return Token::LessThan;
        }

        if c == '>' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Token::GreaterEqual;
            }
            return Token::GreaterThan;
        }

        // Quoted sheet reference
        if c == '\'' {
            return self.scan_quoted_reference();
        }

        // Number
        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        // Identifier, cell reference, or boolean
        if c.is_ascii_alphabetic() || c == '_' {
            return self.scan_identifier_or_ref();
        }

        // Unknown character
        self.advance();
        Token::Invalid(format!("unexpected character '{}'", c))
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part, only when digits follow
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            let sign = self
                .peek_char_at(1)
                .map_or(false, |c| c == '+' || c == '-');
            let digit_at = if sign { 2 } else { 1 };
            if self
                .peek_char_at(digit_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..digit_at {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let num_str = &self.input[start..self.pos];
        match num_str.parse::<f64>() {
            Ok(num) => Token::Number(num),
            Err(_) => Token::Invalid(format!("invalid number '{}'", num_str)),
        }
    }

    fn scan_word(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    fn scan_identifier_or_ref(&mut self) -> Token {
        let text = self.scan_word();

        // Unquoted sheet reference (Sheet1!A1)
        if self.peek_char() == Some(SHEET_SEPARATOR) {
            self.advance();
            return self.scan_sheet_cell(text.to_string());
        }

        // Boolean literals, unless used as a function name
        let upper = text.to_ascii_uppercase();
        if upper == "TRUE" && self.peek_char() != Some('(') {
            return Token::Boolean(true);
        }
        if upper == "FALSE" && self.peek_char() != Some('(') {
            return Token::Boolean(false);
        }

        // A word shaped like a cell name is a reference, unless it is
        // immediately called (LOG10(...) is a function, not a cell)
        if is_cell_name(text) && self.peek_char() != Some('(') {
            return Token::Reference(CellReference::new(None, text));
        }

        Token::Identifier(text.to_string())
    }

    fn scan_quoted_reference(&mut self) -> Token {
        self.advance(); // Skip opening quote

        let start = self.pos;
        while self.peek_char().map_or(false, |c| c != '\'') {
            self.advance();
        }
        if self.is_at_end() {
            return Token::Invalid("unterminated sheet name".into());
        }
        let sheet = self.input[start..self.pos].to_string();
        self.advance(); // Skip closing quote

        if self.peek_char() != Some(SHEET_SEPARATOR) {
            return Token::Invalid(format!("expected '!' after sheet name '{}'", sheet));
        }
        self.advance();
        self.scan_sheet_cell(sheet)
    }

    fn scan_sheet_cell(&mut self, sheet: String) -> Token {
        let cell = self.scan_word();
        if is_cell_name(cell) && self.peek_char() != Some('(') {
            Token::Reference(CellReference::new(Some(sheet), cell))
        } else {
            Token::Invalid(format!("expected cell reference after sheet '{}'", sheet))
        }
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    /// Yields every token up to, but not including, [`Token::Eof`]
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        match self.next_token() {
            Token::Eof => {
                self.finished = true;
                None
            }
            token => Some(token),
        }
    }
}

/// Tokenize a whole expression (without the leading `=`)
pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).collect()
}
