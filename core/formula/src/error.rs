//! FILENAME: core/formula/src/error.rs
//! PURPOSE: Error type shared by registration, lexing, parsing and evaluation.
//! CONTEXT: Parse-time errors abort the whole parse; evaluation errors abort a
//! single evaluation and leave the expression reusable.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormulaError {
    /// Illegal operator characters, non-positive precedence, duplicate registration.
    #[error("Config error: {0}")]
    Config(String),

    /// Structural violation found by the lexer or the parser.
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    /// Unresolved identifier, or an operator used in an arity it is not registered for.
    #[error("Name error: {message}")]
    Name {
        message: String,
        offset: Option<usize>,
    },

    #[error("Attribute error: {0}")]
    Attribute(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Key error: {0}")]
    Key(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Value error: {0}")]
    Value(String),

    /// Division by zero and integer overflow.
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    /// Failure raised by an embedder-supplied callable.
    #[error("{0}")]
    Host(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormulaError {
    pub fn syntax(message: impl Into<String>, offset: usize) -> Self {
        FormulaError::Syntax {
            message: message.into(),
            offset,
        }
    }

    pub fn name(message: impl Into<String>) -> Self {
        FormulaError::Name {
            message: message.into(),
            offset: None,
        }
    }

    pub fn name_at(message: impl Into<String>, offset: usize) -> Self {
        FormulaError::Name {
            message: message.into(),
            offset: Some(offset),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        FormulaError::Type(message.into())
    }

    pub fn host(message: impl Into<String>) -> Self {
        FormulaError::Host(message.into())
    }

    /// Source offset of the failure, when the error was raised at parse time.
    pub fn offset(&self) -> Option<usize> {
        match self {
            FormulaError::Syntax { offset, .. } => Some(*offset),
            FormulaError::Name { offset, .. } => *offset,
            _ => None,
        }
    }
}

pub type FormulaResult<T> = Result<T, FormulaError>;
