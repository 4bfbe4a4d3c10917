//! FILENAME: core/formula/src/ast.rs
//! PURPOSE: Abstract Syntax Tree definitions for formulas.
//! CONTEXT: The parser builds these nodes from tokens. Nodes are immutable and
//! shared through `Arc`, so identifier nodes can be reused within one parse
//! and a finished tree can be evaluated from several threads at once.

use crate::token::{AttributeNames, Number};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Shared handle to a node.
pub type NodeRef = Arc<Node>;

/// The closed set of node kinds.
#[derive(PartialEq)]
pub enum Node {
    Number(Number),
    Str(String),
    NoneLiteral,

    /// Free name, resolved at evaluation time against the context, then the functions.
    Identifier(String),

    UnaryOp {
        op: String,
        operand: NodeRef,
        offset: usize,
    },

    BinaryOp {
        op: String,
        left: NodeRef,
        right: NodeRef,
        offset: usize,
    },

    /// `start:stop:step`; omitted components are `NoneLiteral`.
    Slice {
        start: NodeRef,
        stop: NodeRef,
        step: NodeRef,
    },

    Attribute {
        object: NodeRef,
        names: AttributeNames,
    },

    Tuple(Vec<NodeRef>),
    List(Vec<NodeRef>),

    /// Subscript: `object[index]`, where `index` may be a Slice or a Tuple.
    Item {
        object: NodeRef,
        index: NodeRef,
    },

    Call {
        callee: NodeRef,
        args: Args,
        kwargs: Kwargs,
        /// Offset of the opening parenthesis.
        offset: usize,
    },
}

/// Positional arguments of a call.
#[derive(Debug, Default, PartialEq)]
pub struct Args(pub Vec<NodeRef>);

/// Keyword arguments of a call, in source order, keys unique.
#[derive(Debug, Default, PartialEq)]
pub struct Kwargs(pub Vec<(String, NodeRef)>);

impl Node {
    pub fn is_identifier(&self) -> bool {
        matches!(self, Node::Identifier(_))
    }

    /// Renders the tree as an indented outline, one node per line.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        let mut stack: Vec<(Outline<'_>, String, String)> =
            vec![(Outline::Node(self), String::new(), String::new())];

        while let Some((entry, prefix, indent)) = stack.pop() {
            let (label, children) = entry.describe();
            lines.push(format!("{}{}", prefix, label));

            // Pushed in reverse so the first child is rendered first.
            for (i, child) in children.into_iter().rev().enumerate() {
                if i == 0 {
                    stack.push((child, format!("{}└───", indent), format!("{}    ", indent)));
                } else {
                    stack.push((child, format!("{}├───", indent), format!("{}│   ", indent)));
                }
            }
        }
        lines.join("\n")
    }
}

// ============================================================================
// RENDERING
// ============================================================================

/// Anything that occupies one line of the rendered outline.
enum Outline<'a> {
    Node(&'a Node),
    Args(&'a Args),
    Kwargs(&'a Kwargs),
    Keyword(&'a str, &'a Node),
}

impl<'a> Outline<'a> {
    fn describe(&self) -> (String, Vec<Outline<'a>>) {
        match *self {
            Outline::Node(node) => describe_node(node),
            Outline::Args(args) => (
                "Args".to_string(),
                args.0.iter().map(|a| Outline::Node(a)).collect(),
            ),
            Outline::Kwargs(kwargs) => (
                "Kwargs".to_string(),
                kwargs
                    .0
                    .iter()
                    .map(|(name, value)| Outline::Keyword(name, value))
                    .collect(),
            ),
            Outline::Keyword(name, value) => {
                (format!("Keyword({})", name), vec![Outline::Node(value)])
            }
        }
    }
}

fn describe_node(node: &Node) -> (String, Vec<Outline<'_>>) {
    match node {
        Node::Number(n) => (format!("Number({})", n), vec![]),
        Node::Str(s) => (format!("String({:?})", s), vec![]),
        Node::NoneLiteral => ("None".to_string(), vec![]),
        Node::Identifier(name) => (format!("Identifier({})", name), vec![]),
        Node::UnaryOp { op, operand, .. } => {
            (format!("UnaryOp({})", op), vec![Outline::Node(operand)])
        }
        Node::BinaryOp { op, left, right, .. } => (
            format!("BinaryOp({})", op),
            vec![Outline::Node(left), Outline::Node(right)],
        ),
        Node::Slice { start, stop, step } => (
            "Slice".to_string(),
            vec![Outline::Node(start), Outline::Node(stop), Outline::Node(step)],
        ),
        Node::Attribute { object, names } => (
            format!("Attribute(.{})", names.join(".")),
            vec![Outline::Node(object)],
        ),
        Node::Tuple(elements) => (
            "Tuple".to_string(),
            elements.iter().map(|e| Outline::Node(e)).collect(),
        ),
        Node::List(elements) => (
            "List".to_string(),
            elements.iter().map(|e| Outline::Node(e)).collect(),
        ),
        Node::Item { object, index } => (
            "Item".to_string(),
            vec![Outline::Node(object), Outline::Node(index)],
        ),
        Node::Call {
            callee,
            args,
            kwargs,
            ..
        } => (
            "Call".to_string(),
            vec![
                Outline::Node(callee),
                Outline::Args(args),
                Outline::Kwargs(kwargs),
            ],
        ),
    }
}

// ============================================================================
// DISPLAY
// ============================================================================

fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[NodeRef]) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", node)?;
    }
    Ok(())
}

/// Single-line functional notation, e.g. `BinaryOp(+, Number(2), Identifier(abc))`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Number(n) => write!(f, "Number({})", n),
            Node::Str(s) => write!(f, "String({:?})", s),
            Node::NoneLiteral => write!(f, "None"),
            Node::Identifier(name) => write!(f, "Identifier({})", name),
            Node::UnaryOp { op, operand, .. } => write!(f, "UnaryOp({}, {})", op, operand),
            Node::BinaryOp { .. } => {
                // Left spines can be arbitrarily long; write them with a loop.
                let mut rights = Vec::new();
                let mut current = self;
                while let Node::BinaryOp { op, left, right, .. } = current {
                    write!(f, "BinaryOp({}, ", op)?;
                    rights.push(right);
                    current = left.as_ref();
                }
                write!(f, "{}", current)?;
                for right in rights.into_iter().rev() {
                    write!(f, ", {})", right)?;
                }
                Ok(())
            }
            Node::Slice { start, stop, step } => {
                write!(f, "Slice({}, {}, {})", start, stop, step)
            }
            Node::Attribute { object, names } => {
                write!(f, "Attribute({}, [{}])", object, names.join(", "))
            }
            Node::Tuple(elements) => {
                write!(f, "Tuple([")?;
                write_nodes(f, elements)?;
                write!(f, "])")
            }
            Node::List(elements) => {
                write!(f, "List([")?;
                write_nodes(f, elements)?;
                write!(f, "])")
            }
            Node::Item { object, index } => write!(f, "Item({}, {})", object, index),
            Node::Call {
                callee,
                args,
                kwargs,
                ..
            } => write!(f, "Call({}, {}, {})", callee, args, kwargs),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Args([")?;
        write_nodes(f, &self.0)?;
        write!(f, "])")
    }
}

impl fmt::Display for Kwargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kwargs([")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, "])")
    }
}

// ============================================================================
// DROP
// ============================================================================

/// Placeholder swapped into unlinked spine nodes.
fn detached() -> NodeRef {
    static DETACHED: OnceLock<NodeRef> = OnceLock::new();
    Arc::clone(DETACHED.get_or_init(|| Arc::new(Node::NoneLiteral)))
}

impl Drop for Node {
    /// Unlinks the left spine of an operator chain one node at a time, so
    /// dropping a long chain does not recurse once per operator.
    fn drop(&mut self) {
        let Node::BinaryOp { left, .. } = self else {
            return;
        };
        let mut next = std::mem::replace(left, detached());
        while let Ok(mut node) = Arc::try_unwrap(next) {
            let Node::BinaryOp { left, .. } = &mut node else {
                break;
            };
            next = std::mem::replace(left, detached());
        }
    }
}
