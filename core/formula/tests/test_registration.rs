//! FILENAME: tests/test_registration.rs
//! Integration tests for registering operators and functions.

mod common;

use common::TestHarness;
use formula::operators::precedence;
use formula::{ops, Engine, FormulaError, FormulaResult, NamedArgs, Value};
use std::cmp::Ordering;

// ============================================================================
// OPERATORS
// ============================================================================

#[test]
fn test_custom_operators_end_to_end() {
    let harness = TestHarness::with_custom_operators();
    assert_eq!(
        harness.eval("&*3 + 2000 $% 30 / 6 + max(1, 2, 23)"),
        Value::Float(4060.0)
    );
    assert_eq!(harness.eval("&*3 + 2000 $% 30 / 6"), Value::Float(4037.0));
}

#[test]
fn test_custom_operator_precedence_changes_grouping() {
    let mut low = Engine::new();
    low.register_binary_op("$%", |x, y| ops::mul(ops::add(x, y)?, Value::Int(2)), 100)
        .unwrap();
    let value = low.parse("1 + 2 $% 3").unwrap().evaluate(None).unwrap();
    // (1 + 2) $% 3
    assert_eq!(value, Value::Int(12));

    let mut high = Engine::new();
    high.register_binary_op("$%", |x, y| ops::mul(ops::add(x, y)?, Value::Int(2)), 20_000)
        .unwrap();
    let value = high.parse("1 + 2 $% 3").unwrap().evaluate(None).unwrap();
    // 1 + (2 $% 3)
    assert_eq!(value, Value::Int(11));
}

#[test]
fn test_illegal_operator_registration() {
    let mut engine = Engine::new();
    let add = |x: Value, y: Value| ops::add(x, y);
    assert!(matches!(engine.register_binary_op(".*", add, 20), Err(FormulaError::Config(_))));
    assert!(matches!(engine.register_binary_op("+", add, 20), Err(FormulaError::Config(_))));
    assert!(matches!(engine.register_binary_op("*=", add, -1), Err(FormulaError::Config(_))));
    assert!(matches!(engine.register_binary_op("a+", add, 20), Err(FormulaError::Config(_))));
    assert!(matches!(engine.register_unary_op(".*", |x| Ok(x)), Err(FormulaError::Config(_))));
    assert!(matches!(engine.register_unary_op("+", |x| Ok(x)), Err(FormulaError::Config(_))));
}

#[test]
fn test_operator_can_be_both_unary_and_binary() {
    let mut engine = Engine::new();
    engine.register_unary_op("*", |x| ops::mul(x.clone(), x)).unwrap();
    assert!(engine.operators().is_binary("*"));
    assert_eq!(engine.parse("*3 * 2").unwrap().evaluate(None).unwrap(), Value::Int(18));
}

#[test]
fn test_longer_operator_wins_over_prefix() {
    let mut engine = Engine::new();
    let spaceship = |x: Value, y: Value| -> FormulaResult<Value> {
        let order = match ops::ordering("<=>", &x, &y)? {
            Some(Ordering::Less) => -1,
            Some(Ordering::Greater) => 1,
            _ => 0,
        };
        Ok(Value::Int(order))
    };
    engine
        .register_binary_op("<=>", spaceship, precedence::COMPARISON)
        .unwrap();
    assert_eq!(engine.parse("1 <=> 2").unwrap().evaluate(None).unwrap(), Value::Int(-1));
    assert_eq!(engine.parse("1 <= 2").unwrap().evaluate(None).unwrap(), Value::Bool(true));
}

// ============================================================================
// FUNCTIONS
// ============================================================================

#[test]
fn test_duplicate_function_registration_fails() {
    let mut engine = Engine::new();
    let noop = |_args: Vec<Value>, _kwargs: NamedArgs| -> FormulaResult<Value> { Ok(Value::None) };
    assert!(matches!(engine.register_function("sum", noop), Err(FormulaError::Config(_))));
    assert!(engine.register_function("noop", noop).is_ok());
    assert!(matches!(engine.register_function("noop", noop), Err(FormulaError::Config(_))));
    assert!(matches!(engine.register_function("no op", noop), Err(FormulaError::Config(_))));
}

#[test]
fn test_functions_receive_keyword_arguments_in_order() {
    let mut engine = Engine::new();
    engine
        .register_function("describe", |args, kwargs| {
            let names: Vec<String> = kwargs.names().map(str::to_string).collect();
            Ok(Value::from(format!("{} positional, keywords {}", args.len(), names.join(","))))
        })
        .unwrap();
    let value = engine
        .parse("describe(1, 2, z=3, a=4)")
        .unwrap()
        .evaluate(None)
        .unwrap();
    assert_eq!(value, Value::from("2 positional, keywords z,a"));
}

// ============================================================================
// REGISTRY SNAPSHOTS
// ============================================================================

#[test]
fn test_registration_does_not_affect_parsed_expressions() {
    let mut engine = Engine::new();
    let before = engine.parse("late(1)").unwrap();
    engine
        .register_function("late", |args, _kwargs| Ok(args.into_iter().next().unwrap_or(Value::None)))
        .unwrap();
    let after = engine.parse("late(1)").unwrap();

    assert!(matches!(before.evaluate(None), Err(FormulaError::Name { .. })));
    assert_eq!(after.evaluate(None).unwrap(), Value::Int(1));
}

#[test]
fn test_cloned_engines_are_independent() {
    let base = Engine::new();
    let mut extended = base.clone();
    extended.register_unary_op("!", |x| Ok(Value::Bool(!x.is_truthy()))).unwrap();

    assert!(extended.parse("!0").is_ok());
    assert!(matches!(base.parse("!0"), Err(FormulaError::Syntax { .. })));
}
