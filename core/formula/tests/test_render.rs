//! FILENAME: tests/test_render.rs
//! Golden-output tests for the tree outline renderer.

mod common;

use common::TestHarness;
use pretty_assertions::assert_eq;

#[test]
fn test_render_binary_and_call() {
    let harness = TestHarness::new();
    let expected = "\
BinaryOp(+)
├───Number(2)
└───BinaryOp(*)
    ├───Number(3)
    └───Call
        ├───Identifier(max)
        ├───Args
        │   ├───Number(5)
        │   ├───Number(6)
        │   └───Number(2)
        └───Kwargs";
    assert_eq!(harness.render("2 + 3 * max(5, 6, 2)"), expected);
}

#[test]
fn test_render_keywords_and_slices() {
    let harness = TestHarness::new();
    let expected = "\
Call
├───Identifier(sum)
├───Args
│   └───Item
│       ├───Identifier(xs)
│       └───Slice
│           ├───None
│           ├───None
│           └───Number(2)
└───Kwargs
    └───Keyword(start)
        └───Number(1)";
    assert_eq!(harness.render("sum(xs[::2], start=1)"), expected);
}

#[test]
fn test_render_unary_attribute_and_string() {
    let harness = TestHarness::new();
    let expected = "\
UnaryOp(-)
└───Item
    ├───Attribute(.b)
    │   └───Identifier(a)
    └───String(\"k\")";
    assert_eq!(harness.render("-a.b[\"k\"]"), expected);
}

#[test]
fn test_render_containers() {
    let harness = TestHarness::new();
    let expected = "\
Tuple
├───Number(1.5)
└───List
    ├───Number(2000.0)
    └───List";
    assert_eq!(harness.render("(1.5, [2e3, []])"), expected);
}

#[test]
fn test_render_single_leaf() {
    let harness = TestHarness::new();
    assert_eq!(harness.render("abc"), "Identifier(abc)");
}
