//! FILENAME: core/formula/src/lib.rs
//! PURPOSE: Library root for the embeddable formula engine.
//! CONTEXT: Exposes the engine facade plus the lexer, parser, AST and
//! evaluator for callers that want to drive the pipeline themselves.
//!
//! PIPELINE: Formula String --> Lexer --> Tokens --> Parser --> AST --> Evaluator
//!
//! SUPPORTED FEATURES:
//! - Registrable binary operators with caller-defined precedence
//! - Registrable unary operators and functions
//! - Numbers (int/float), strings, None
//! - Parenthesized grouping and tuples: (1 + 2), (1, 2)
//! - Lists, indexing and slicing: [1, 2, 3][::2]
//! - Attribute chains: math.consts.pi
//! - Positional and keyword arguments: sum(xs, start=2)

pub mod ast;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod logging;
pub mod operators;
pub mod ops;
pub mod options;
pub mod parser;
pub mod token;
pub mod value;


// Re-export commonly used types for convenience
pub use ast::{Args, Kwargs, Node, NodeRef};
pub use context::Context;
pub use engine::{Engine, Expression};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::Evaluator;
pub use functions::FunctionRegistry;
pub use lexer::Lexer;
pub use operators::{OperatorRegistry, OPERATOR_CHARS};
pub use options::EngineOptions;
pub use parser::{parse, Parser};
pub use token::{Number, Token, TokenKind};
pub use value::{Callable, Function, HostObject, NamedArgs, SliceValue, Value};
