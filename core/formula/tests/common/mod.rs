//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for formula engine integration tests.

#![allow(dead_code)]

use formula::{ops, Context, Engine, Expression, FormulaError, FormulaResult, Value};

/// Test harness bundling an engine with an evaluation context.
pub struct TestHarness {
    pub engine: Engine,
    pub context: Context,
}

impl TestHarness {
    /// Create a harness with a default engine and an empty context.
    pub fn new() -> Self {
        TestHarness {
            engine: Engine::new(),
            context: Context::new(),
        }
    }

    /// Create a harness with `abc = 5` and `bcd = 9`.
    pub fn with_sample_context() -> Self {
        let mut harness = Self::new();
        harness.set("abc", 5);
        harness.set("bcd", 9);
        harness
    }

    /// Sample context plus the `neg_sum` and `ratio_sum` functions.
    pub fn with_demo_functions() -> Self {
        let mut harness = Self::with_sample_context();
        harness
            .engine
            .register_function("neg_sum", |args, _kwargs| {
                let total = args.into_iter().try_fold(Value::Int(0), ops::add)?;
                ops::neg(total)
            })
            .unwrap();
        harness
            .engine
            .register_function("ratio_sum", |args, _kwargs| {
                let mut args = args.into_iter();
                let ratio = args
                    .next()
                    .ok_or_else(|| FormulaError::type_error("ratio_sum() missing argument 'ratio'"))?;
                let total = args.try_fold(Value::Int(0), ops::add)?;
                ops::mul(total, ratio)
            })
            .unwrap();
        harness
    }

    /// Unary `&*` (cube) and binary `$%` (`(x + y) * 2`) between `+` and `*`.
    pub fn with_custom_operators() -> Self {
        let mut harness = Self::new();
        harness
            .engine
            .register_unary_op("&*", |x| ops::power(x, Value::Int(3)))
            .unwrap();
        harness
            .engine
            .register_binary_op("$%", |x, y| ops::mul(ops::add(x, y)?, Value::Int(2)), 16_500)
            .unwrap();
        harness
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.context.insert(name, value);
    }

    pub fn parse(&self, formula: &str) -> Expression {
        self.engine
            .parse(formula)
            .unwrap_or_else(|err| panic!("failed to parse {:?}: {}", formula, err))
    }

    pub fn try_eval(&self, formula: &str) -> FormulaResult<Value> {
        self.engine.parse(formula)?.evaluate(Some(&self.context))
    }

    pub fn eval(&self, formula: &str) -> Value {
        self.try_eval(formula)
            .unwrap_or_else(|err| panic!("failed to evaluate {:?}: {}", formula, err))
    }

    pub fn render(&self, formula: &str) -> String {
        self.parse(formula).render()
    }
}

/// Build a list value from integers.
pub fn ints(values: &[i64]) -> Value {
    Value::List(values.iter().copied().map(Value::Int).collect())
}
