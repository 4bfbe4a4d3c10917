//! FILENAME: core/formula/src/engine.rs
//! PURPOSE: Public entry point: registration, parsing and evaluation.
//! CONTEXT: An `Engine` owns one operator registry, one function registry
//! and its options. Registries are shared copy-on-write with the expressions
//! parsed from them, so registering something new never changes how an
//! already parsed expression evaluates.

use crate::ast::NodeRef;
use crate::context::Context;
use crate::error::FormulaResult;
use crate::evaluator::Evaluator;
use crate::functions::FunctionRegistry;
use crate::operators::OperatorRegistry;
use crate::options::EngineOptions;
use crate::parser::Parser;
use crate::value::{NamedArgs, Value};
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Engine {
    operators: Arc<OperatorRegistry>,
    functions: Arc<FunctionRegistry>,
    options: EngineOptions,
}

impl Engine {
    /// Creates an engine with the default operators and builtin functions.
    pub fn new() -> Self {
        Engine::default()
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Engine {
            options,
            ..Engine::default()
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn register_function<F>(&mut self, name: &str, func: F) -> FormulaResult<()>
    where
        F: Fn(Vec<Value>, NamedArgs) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.functions)
            .register(name, func)
            .map_err(|err| {
                crate::log_warn!("CONFIG", "rejected function '{}': {}", name, err);
                err
            })
    }

    pub fn register_binary_op<F>(&mut self, lexeme: &str, func: F, precedence: i32) -> FormulaResult<()>
    where
        F: Fn(Value, Value) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.operators)
            .register_binary(lexeme, func, precedence)
            .map_err(|err| {
                crate::log_warn!("CONFIG", "rejected binary operator '{}': {}", lexeme, err);
                err
            })
    }

    pub fn register_unary_op<F>(&mut self, lexeme: &str, func: F) -> FormulaResult<()>
    where
        F: Fn(Value) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.operators)
            .register_unary(lexeme, func)
            .map_err(|err| {
                crate::log_warn!("CONFIG", "rejected unary operator '{}': {}", lexeme, err);
                err
            })
    }

    /// Parses a formula against the current registries.
    pub fn parse(&self, text: &str) -> FormulaResult<Expression> {
        let root = Parser::new(text, &self.operators)
            .and_then(|parser| parser.with_max_depth(self.options.max_depth).parse())
            .map_err(|err| {
                crate::log_debug!("PARSE", "failed to parse {:?}: {}", text, err);
                err
            })?;
        Ok(Expression {
            source: text.to_string(),
            root,
            operators: Arc::clone(&self.operators),
            functions: Arc::clone(&self.functions),
        })
    }

    pub fn evaluate(&self, expression: &Expression, context: Option<&Context>) -> FormulaResult<Value> {
        expression.evaluate(context)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("operators", &self.operators)
            .field("functions", &self.functions)
            .field("options", &self.options)
            .finish()
    }
}

/// A parsed formula bound to the registries it was parsed against.
#[derive(Clone)]
pub struct Expression {
    source: String,
    root: NodeRef,
    operators: Arc<OperatorRegistry>,
    functions: Arc<FunctionRegistry>,
}

impl Expression {
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression. A failed evaluation leaves it reusable.
    pub fn evaluate(&self, context: Option<&Context>) -> FormulaResult<Value> {
        let evaluator = Evaluator::new(&self.operators, &self.functions, context);
        self.root.evaluate(&evaluator)
    }

    pub fn render(&self) -> String {
        self.root.render()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .field("root", &self.root)
            .finish()
    }
}
