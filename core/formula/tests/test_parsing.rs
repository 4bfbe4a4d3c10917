//! FILENAME: tests/test_parsing.rs
//! Integration tests for parsing through the engine facade.

mod common;

use common::TestHarness;
use formula::{Context, Engine, EngineOptions, FormulaError, Node, Value};
use std::sync::Arc;

// ============================================================================
// TREE SHAPE
// ============================================================================

#[test]
fn test_display_uses_functional_notation() {
    let harness = TestHarness::new();
    assert_eq!(
        harness.parse("2 + abc").to_string(),
        "BinaryOp(+, Number(2), Identifier(abc))"
    );
    assert_eq!(
        harness.parse("f(1, k=\"v\")").to_string(),
        "Call(Identifier(f), Args([Number(1)]), Kwargs([k=String(\"v\")]))"
    );
}

#[test]
fn test_expression_keeps_source() {
    let harness = TestHarness::new();
    let expression = harness.parse("  1 + 2 ");
    assert_eq!(expression.source(), "  1 + 2 ");
    assert!(matches!(expression.root().as_ref(), Node::BinaryOp { .. }));
}

#[test]
fn test_identifiers_are_shared_within_one_parse() {
    let harness = TestHarness::new();
    let expression = harness.parse("1 + abc - cef * abc");
    let Node::BinaryOp { left, right, .. } = expression.root().as_ref() else {
        panic!("expected a binary operation");
    };
    let (Node::BinaryOp { right: first, .. }, Node::BinaryOp { right: second, .. }) =
        (left.as_ref(), right.as_ref())
    else {
        panic!("unexpected tree shape");
    };
    assert!(Arc::ptr_eq(first, second));
    assert_eq!(first.as_ref(), &Node::Identifier("abc".to_string()));
}

#[test]
fn test_identifiers_are_not_shared_across_parses() {
    let harness = TestHarness::new();
    let a = harness.parse("abc");
    let b = harness.parse("abc");
    assert!(!Arc::ptr_eq(a.root(), b.root()));
    assert_eq!(a.root(), b.root());
}

#[test]
fn test_attribute_chain_precedes_calls() {
    let harness = TestHarness::new();
    let expression = harness.parse("a.b.c(1)");
    let Node::Call { callee, args, .. } = expression.root().as_ref() else {
        panic!("expected a call");
    };
    assert_eq!(args.0.len(), 1);
    let Node::Attribute { object, names } = callee.as_ref() else {
        panic!("expected an attribute chain");
    };
    assert_eq!(names.as_slice(), &["b".to_string(), "c".to_string()]);
    assert!(object.is_identifier());
}

// ============================================================================
// ERRORS
// ============================================================================

#[test]
fn test_syntax_errors_carry_offsets() {
    let engine = Engine::new();
    let cases = [
        ("1 +", 3),
        ("(1, 2", 0),
        ("[1, 2", 0),
        ("x[1:2:3:4]", 7),
        ("\"abc", 0),
        ("1 # 2", 2),
        ("f(a=1, 2)", 7),
        ("()", 0),
        ("1 + 99999999999999999999", 4),
    ];
    for (formula, offset) in cases {
        let err = engine.parse(formula).unwrap_err();
        assert!(
            matches!(err, FormulaError::Syntax { .. }),
            "{:?} should be a syntax error, got {}",
            formula,
            err
        );
        assert_eq!(err.offset(), Some(offset), "offset for {:?}", formula);
    }
}

#[test]
fn test_operator_arity_errors_are_name_errors() {
    let engine = Engine::new();
    assert!(matches!(engine.parse("1 ~ 2"), Err(FormulaError::Name { .. })));
    assert!(matches!(engine.parse("// 2"), Err(FormulaError::Name { .. })));
}

#[test]
fn test_parsing_is_all_or_nothing() {
    let engine = Engine::new();
    assert!(engine.parse("1 + 2 3").is_err());
    assert!(engine.parse("1 + 2").is_ok());
}

#[test]
fn test_unknown_names_are_deferred_to_evaluation() {
    let engine = Engine::new();
    let expression = engine.parse("run()").unwrap();
    assert!(matches!(expression.evaluate(None), Err(FormulaError::Name { .. })));
}

// ============================================================================
// DEPTH LIMIT
// ============================================================================

#[test]
fn test_deep_nesting_is_rejected_instead_of_overflowing() {
    let engine = Engine::new();
    let formula = format!("{}1{}", "[".repeat(50_000), "]".repeat(50_000));
    let err = engine.parse(&formula).unwrap_err();
    assert!(err.to_string().contains("nested too deeply"));
}

#[test]
fn test_depth_limit_is_configurable() {
    let options = EngineOptions::from_json(r#"{"max_depth": 2}"#).unwrap();
    let engine = Engine::with_options(options);
    assert!(engine.parse("-(1)").is_ok());
    assert!(engine.parse("--(1)").is_err());
    assert_eq!(engine.options().max_depth, 2);
}

#[test]
fn test_long_flat_chains_are_not_nesting() {
    let engine = Engine::new();
    let sum = vec!["1"; 1_000].join(" + ");
    assert_eq!(engine.parse(&sum).unwrap().evaluate(None).unwrap(), Value::Int(1_000));

    let mixed = vec!["2 * 3"; 1_000].join(" - ");
    assert_eq!(engine.parse(&mixed).unwrap().evaluate(None).unwrap(), Value::Int(-5_988));

    let strict = Engine::with_options(EngineOptions { max_depth: 5 });
    let product = vec!["x"; 10_000].join(" * ");
    let context = Context::new().with("x", 1);
    let expression = strict.parse(&product).unwrap();
    assert_eq!(expression.evaluate(Some(&context)).unwrap(), Value::Int(1));
}
