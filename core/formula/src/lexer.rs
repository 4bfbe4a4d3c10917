//! FILENAME: core/formula/src/lexer.rs
//! PURPOSE: Converts raw formula text into a stream of tokens.
//! CONTEXT: Operators are not hard-coded: the lexer consults the operator
//! registry and takes the longest registered lexeme at the current position.

use crate::error::{FormulaError, FormulaResult};
use crate::operators::{OperatorRegistry, OPERATOR_CHARS};
use crate::token::{AttributeNames, Number, Token, TokenKind};

pub struct Lexer<'a> {
    chars: Vec<char>,
    position: usize,
    operators: &'a OperatorRegistry,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &str, operators: &'a OperatorRegistry) -> Self {
        Lexer {
            chars: input.chars().collect(),
            position: 0,
            operators,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_char(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.position + ahead).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Returns the next token. After the input is exhausted every call yields EOF.
    pub fn next_token(&mut self) -> FormulaResult<Token> {
        self.skip_whitespace();
        let start = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(Token::new(TokenKind::EOF, start));
        };

        if ch.is_ascii_digit() {
            return self.read_number();
        }
        if ch == '"' {
            return self.read_string();
        }
        if is_identifier_start(ch) {
            let name = self.read_name();
            return Ok(Token::new(TokenKind::Identifier(name), start));
        }
        if ch == '.' && self.peek_char(1).is_some_and(is_identifier_start) {
            return Ok(self.read_attribute());
        }
        if OPERATOR_CHARS.contains(ch) {
            return self.read_operator();
        }

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LSquare,
            ']' => TokenKind::RSquare,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            other => {
                return Err(FormulaError::syntax(
                    format!("unexpected character '{}'", other),
                    start,
                ))
            }
        };
        self.advance();
        Ok(Token::new(kind, start))
    }

    /// Tokenizes the whole input. The last token is always EOF.
    pub fn tokenize(mut self) -> FormulaResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::EOF;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn consume_digits(&mut self, text: &mut String) {
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Reads `\d+(\.\d+)?([eE][+-]?\d+)?`. A fraction or exponent makes it a float.
    fn read_number(&mut self) -> FormulaResult<Token> {
        let start = self.position;
        let mut text = String::new();
        let mut is_float = false;

        self.consume_digits(&mut text);

        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.advance();
            self.consume_digits(&mut text);
        }

        if matches!(self.current_char(), Some('e' | 'E')) {
            let signed = matches!(self.peek_char(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_char(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.advance();
                if signed {
                    if let Some(sign) = self.current_char() {
                        text.push(sign);
                    }
                    self.advance();
                }
                self.consume_digits(&mut text);
            }
        }

        let number = if is_float {
            text.parse::<f64>().map(Number::Float).map_err(|_| {
                FormulaError::syntax(format!("invalid number literal '{}'", text), start)
            })?
        } else {
            text.parse::<i64>().map(Number::Int).map_err(|_| {
                FormulaError::syntax(format!("integer literal '{}' is too large", text), start)
            })?
        };
        Ok(Token::new(TokenKind::Number(number), start))
    }

    /// Reads a double-quoted string. Supported escapes: \n \t \" \\
    fn read_string(&mut self) -> FormulaResult<Token> {
        let start = self.position;
        self.advance(); // opening quote
        let mut text = String::new();

        loop {
            match self.current_char() {
                None => return Err(FormulaError::syntax("unterminated string", start)),
                Some('"') => {
                    self.advance();
                    return Ok(Token::new(TokenKind::String(text), start));
                }
                Some('\\') => {
                    let escape_at = self.position;
                    let escaped = match self.peek_char(1) {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some(other) => {
                            return Err(FormulaError::syntax(
                                format!("unsupported escape sequence '\\{}'", other),
                                escape_at,
                            ))
                        }
                        None => return Err(FormulaError::syntax("unterminated string", start)),
                    };
                    text.push(escaped);
                    self.position += 2;
                }
                Some(ch) => {
                    text.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.current_char() {
            if is_identifier_continue(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        name
    }

    /// Reads one or more `.name` segments as a single token.
    fn read_attribute(&mut self) -> Token {
        let start = self.position;
        let mut names = AttributeNames::new();
        while self.current_char() == Some('.') && self.peek_char(1).is_some_and(is_identifier_start) {
            self.advance();
            names.push(self.read_name());
        }
        Token::new(TokenKind::Attribute(names), start)
    }

    fn read_operator(&mut self) -> FormulaResult<Token> {
        let start = self.position;
        if let Some(lexeme) = self.operators.longest_match(&self.chars[start..]) {
            let lexeme = lexeme.to_string();
            self.position += lexeme.chars().count();
            return Ok(Token::new(TokenKind::Operator(lexeme), start));
        }
        match self.current_char() {
            Some('=') => {
                self.advance();
                Ok(Token::new(TokenKind::Assignment, start))
            }
            Some(ch) => Err(FormulaError::syntax(format!("unknown operator '{}'", ch), start)),
            None => Ok(Token::new(TokenKind::EOF, start)),
        }
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_identifier_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
