//! FILENAME: core/formula/src/operators.rs
//! PURPOSE: Registry of unary and binary operators.
//! CONTEXT: The lexer asks the registry which lexemes exist (longest match
//! wins), the parser asks for arity and precedence, and the evaluator looks
//! up the callable. A fresh registry carries the default operator set.

use crate::error::{FormulaError, FormulaResult};
use crate::ops;
use crate::value::Value;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Characters an operator lexeme may be built from.
pub const OPERATOR_CHARS: &str = "+-*/<>=`~!@#$%^&|?";

/// Precedences of the default binary operators. Larger binds tighter.
pub mod precedence {
    pub const COMPARISON: i32 = 11_000;
    pub const BITWISE_OR: i32 = 12_000;
    pub const BITWISE_XOR: i32 = 13_000;
    pub const BITWISE_AND: i32 = 14_000;
    pub const SHIFT: i32 = 15_000;
    pub const ADDITIVE: i32 = 16_000;
    pub const MULTIPLICATIVE: i32 = 17_000;
    /// Above the multiplicative level: `2 * 3 ** 2` is 18.
    pub const POWER: i32 = 18_000;
}

pub type BinaryFn = Arc<dyn Fn(Value, Value) -> FormulaResult<Value> + Send + Sync>;
pub type UnaryFn = Arc<dyn Fn(Value) -> FormulaResult<Value> + Send + Sync>;

#[derive(Clone)]
pub struct BinaryOperator {
    pub func: BinaryFn,
    pub precedence: i32,
}

#[derive(Clone)]
pub struct OperatorRegistry {
    binary: FxHashMap<String, BinaryOperator>,
    unary: FxHashMap<String, UnaryFn>,
}

impl OperatorRegistry {
    /// Creates a registry holding the default operators.
    pub fn new() -> Self {
        use precedence::*;

        let mut registry = OperatorRegistry::empty();
        let binary: [(&str, fn(Value, Value) -> FormulaResult<Value>, i32); 19] = [
            ("<", ops::lt, COMPARISON),
            ("<=", ops::le, COMPARISON),
            ("==", ops::eq, COMPARISON),
            ("!=", ops::ne, COMPARISON),
            (">=", ops::ge, COMPARISON),
            (">", ops::gt, COMPARISON),
            ("|", ops::bit_or, BITWISE_OR),
            ("^", ops::bit_xor, BITWISE_XOR),
            ("&", ops::bit_and, BITWISE_AND),
            ("<<", ops::lshift, SHIFT),
            (">>", ops::rshift, SHIFT),
            ("+", ops::add, ADDITIVE),
            ("-", ops::sub, ADDITIVE),
            ("*", ops::mul, MULTIPLICATIVE),
            ("/", ops::truediv, MULTIPLICATIVE),
            ("//", ops::floordiv, MULTIPLICATIVE),
            ("%", ops::modulo, MULTIPLICATIVE),
            ("@", ops::matmul, MULTIPLICATIVE),
            ("**", ops::power, POWER),
        ];
        for (lexeme, func, precedence) in binary {
            registry.binary.insert(
                lexeme.to_string(),
                BinaryOperator {
                    func: Arc::new(func),
                    precedence,
                },
            );
        }

        let unary: [(&str, fn(Value) -> FormulaResult<Value>); 3] =
            [("+", ops::pos), ("-", ops::neg), ("~", ops::invert)];
        for (lexeme, func) in unary {
            registry.unary.insert(lexeme.to_string(), Arc::new(func));
        }
        registry
    }

    /// Creates a registry with no operators at all.
    pub fn empty() -> Self {
        OperatorRegistry {
            binary: FxHashMap::default(),
            unary: FxHashMap::default(),
        }
    }

    /// True when the lexeme is non-empty and built from operator characters only.
    pub fn is_legal(lexeme: &str) -> bool {
        !lexeme.is_empty() && lexeme.chars().all(|c| OPERATOR_CHARS.contains(c))
    }

    fn check_legal(lexeme: &str) -> FormulaResult<()> {
        if Self::is_legal(lexeme) {
            Ok(())
        } else {
            Err(FormulaError::Config(format!(
                "illegal operator '{}': operators must be non-empty and may only contain \"{}\"",
                lexeme, OPERATOR_CHARS
            )))
        }
    }

    pub fn register_binary<F>(&mut self, lexeme: &str, func: F, precedence: i32) -> FormulaResult<()>
    where
        F: Fn(Value, Value) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        Self::check_legal(lexeme)?;
        if precedence <= 0 {
            return Err(FormulaError::Config(format!(
                "precedence of operator '{}' must be greater than 0, got {}",
                lexeme, precedence
            )));
        }
        if self.binary.contains_key(lexeme) {
            return Err(FormulaError::Config(format!(
                "binary operator '{}' is already registered",
                lexeme
            )));
        }
        crate::log_debug!("OPS", "registered binary operator '{}' (precedence {})", lexeme, precedence);
        self.binary.insert(
            lexeme.to_string(),
            BinaryOperator {
                func: Arc::new(func),
                precedence,
            },
        );
        Ok(())
    }

    pub fn register_unary<F>(&mut self, lexeme: &str, func: F) -> FormulaResult<()>
    where
        F: Fn(Value) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        Self::check_legal(lexeme)?;
        if self.unary.contains_key(lexeme) {
            return Err(FormulaError::Config(format!(
                "unary operator '{}' is already registered",
                lexeme
            )));
        }
        crate::log_debug!("OPS", "registered unary operator '{}'", lexeme);
        self.unary.insert(lexeme.to_string(), Arc::new(func));
        Ok(())
    }

    pub fn binary(&self, lexeme: &str) -> Option<&BinaryOperator> {
        self.binary.get(lexeme)
    }

    pub fn unary(&self, lexeme: &str) -> Option<&UnaryFn> {
        self.unary.get(lexeme)
    }

    pub fn precedence(&self, lexeme: &str) -> Option<i32> {
        self.binary.get(lexeme).map(|op| op.precedence)
    }

    pub fn is_binary(&self, lexeme: &str) -> bool {
        self.binary.contains_key(lexeme)
    }

    pub fn is_unary(&self, lexeme: &str) -> bool {
        self.unary.contains_key(lexeme)
    }

    /// All registered lexemes, unary and binary, without duplicates.
    pub fn lexemes(&self) -> Vec<&str> {
        let mut lexemes: Vec<&str> = self
            .binary
            .keys()
            .chain(self.unary.keys())
            .map(String::as_str)
            .collect();
        lexemes.sort_unstable();
        lexemes.dedup();
        lexemes
    }

    /// Returns the longest registered lexeme that is a prefix of `input`.
    pub fn longest_match(&self, input: &[char]) -> Option<&str> {
        self.binary
            .keys()
            .chain(self.unary.keys())
            .filter(|lexeme| is_prefix(lexeme, input))
            .max_by_key(|lexeme| lexeme.chars().count())
            .map(String::as_str)
    }
}

fn is_prefix(lexeme: &str, input: &[char]) -> bool {
    let mut count = 0;
    for c in lexeme.chars() {
        if input.get(count) != Some(&c) {
            return false;
        }
        count += 1;
    }
    true
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut binary: Vec<(&str, i32)> = self
            .binary
            .iter()
            .map(|(lexeme, op)| (lexeme.as_str(), op.precedence))
            .collect();
        binary.sort_unstable();
        let mut unary: Vec<&str> = self.unary.keys().map(String::as_str).collect();
        unary.sort_unstable();
        f.debug_struct("OperatorRegistry")
            .field("binary", &binary)
            .field("unary", &unary)
            .finish()
    }
}
