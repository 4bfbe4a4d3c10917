//! FILENAME: core/formula/src/token.rs
//! PURPOSE: Token definitions for the formula lexer.
//! CONTEXT: Tokens are the atomic units produced by the lexer and consumed by
//! the parser. Each token remembers the 0-based character offset it started at.

use smallvec::SmallVec;

/// A numeric literal. Integer-only lexemes stay integers, everything else is a float.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// Property names of an attribute-chain token such as `.a.b.c`.
pub type AttributeNames = SmallVec<[String; 2]>;

/// Token kinds recognized by the formula lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum TokenKind {
    // Literals
    Number(Number),
    String(String),
    Identifier(String),

    /// Any registered unary or binary operator lexeme.
    Operator(String),

    /// One or more `.name` segments consumed as a single token.
    Attribute(AttributeNames),

    // Delimiters
    LParen,
    RParen,
    LSquare,
    RSquare,
    /// Keyword-argument marker: `=`
    Assignment,
    Colon,
    Comma,

    // Special
    EOF,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, offset: usize) -> Self {
        Token { kind, offset }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            Number::Float(n) => write!(f, "{}", crate::value::format_float(*n)),
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::String(s) => write!(f, "\"{}\"", s),
            TokenKind::Identifier(s) => write!(f, "{}", s),
            TokenKind::Operator(op) => write!(f, "{}", op),
            TokenKind::Attribute(names) => {
                for name in names {
                    write!(f, ".{}", name)?;
                }
                Ok(())
            }
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LSquare => write!(f, "["),
            TokenKind::RSquare => write!(f, "]"),
            TokenKind::Assignment => write!(f, "="),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::EOF => write!(f, "EOF"),
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' at offset {}", self.kind, self.offset)
    }
}
