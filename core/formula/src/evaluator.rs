//! FILENAME: core/formula/src/evaluator.rs
//! PURPOSE: Evaluates an AST against registries and an optional context.
//! CONTEXT: The evaluator never mutates the tree or the context. Errors raised
//! by operator callables and functions are passed through unchanged; the node
//! offset only shows up in the debug log.

use crate::ast::{Args, Kwargs, Node};
use crate::context::Context;
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FunctionRegistry;
use crate::operators::OperatorRegistry;
use crate::token::Number;
use crate::value::{NamedArgs, SliceValue, Value};
use std::sync::Arc;

pub struct Evaluator<'a> {
    operators: &'a OperatorRegistry,
    functions: &'a FunctionRegistry,
    context: Option<&'a Context>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        operators: &'a OperatorRegistry,
        functions: &'a FunctionRegistry,
        context: Option<&'a Context>,
    ) -> Self {
        Evaluator {
            operators,
            functions,
            context,
        }
    }

    /// Evaluates a node to a value.
    pub fn evaluate(&self, node: &Node) -> FormulaResult<Value> {
        match node {
            Node::Number(Number::Int(n)) => Ok(Value::Int(*n)),
            Node::Number(Number::Float(n)) => Ok(Value::Float(*n)),
            Node::Str(s) => Ok(Value::Str(s.clone())),
            Node::NoneLiteral => Ok(Value::None),
            Node::Identifier(name) => self.resolve(name),
            Node::UnaryOp {
                op,
                operand,
                offset,
            } => self.eval_unary_op(op, operand, *offset),
            Node::BinaryOp { .. } => self.eval_binary_chain(node),
            Node::Slice { start, stop, step } => Ok(Value::from(SliceValue::new(
                self.evaluate(start)?,
                self.evaluate(stop)?,
                self.evaluate(step)?,
            ))),
            Node::Attribute { object, names } => {
                let mut value = self.evaluate(object)?;
                for name in names {
                    value = value.get_attr(name)?;
                }
                Ok(value)
            }
            Node::Tuple(elements) => Ok(Value::Tuple(self.eval_all(elements)?)),
            Node::List(elements) => Ok(Value::List(self.eval_all(elements)?)),
            Node::Item { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                object.get_item(&index)
            }
            Node::Call {
                callee,
                args,
                kwargs,
                offset,
            } => self.eval_call(callee, args, kwargs, *offset),
        }
    }

    /// Context entries shadow registered functions.
    fn resolve(&self, name: &str) -> FormulaResult<Value> {
        if let Some(value) = self.context.and_then(|ctx| ctx.get(name)) {
            return Ok(value.clone());
        }
        match self.functions.get(name) {
            Some(func) => Ok(Value::Function(func.clone())),
            None => Err(FormulaError::name(format!("name '{}' is not defined", name))),
        }
    }

    fn eval_all(&self, nodes: &[Arc<Node>]) -> FormulaResult<Vec<Value>> {
        nodes.iter().map(|node| self.evaluate(node)).collect()
    }

    fn eval_unary_op(&self, op: &str, operand: &Node, offset: usize) -> FormulaResult<Value> {
        let func = self.operators.unary(op).ok_or_else(|| {
            FormulaError::name_at(format!("unary operator '{}' is not registered", op), offset)
        })?;
        let value = self.evaluate(operand)?;
        func(value).map_err(|err| {
            crate::log_debug!("EVAL", "unary '{}' at offset {} failed: {}", op, offset, err);
            err
        })
    }

    /// Evaluates the left spine of an operator chain with a loop. Chains such
    /// as `1 + 2 + ... + n` only nest on the left, so they never recurse
    /// once per operator; left operands are still evaluated first.
    fn eval_binary_chain(&self, node: &Node) -> FormulaResult<Value> {
        let mut spine = Vec::new();
        let mut current = node;
        while let Node::BinaryOp {
            op,
            left,
            right,
            offset,
        } = current
        {
            spine.push((op.as_str(), right.as_ref(), *offset));
            current = left.as_ref();
        }

        let mut value = self.evaluate(current)?;
        for (op, right, offset) in spine.into_iter().rev() {
            value = self.eval_binary_op(op, value, right, offset)?;
        }
        Ok(value)
    }

    fn eval_binary_op(
        &self,
        op: &str,
        lhs: Value,
        right: &Node,
        offset: usize,
    ) -> FormulaResult<Value> {
        let operator = self.operators.binary(op).ok_or_else(|| {
            FormulaError::name_at(format!("binary operator '{}' is not registered", op), offset)
        })?;
        let rhs = self.evaluate(right)?;
        (operator.func)(lhs, rhs).map_err(|err| {
            crate::log_debug!("EVAL", "binary '{}' at offset {} failed: {}", op, offset, err);
            err
        })
    }

    fn eval_call(
        &self,
        callee: &Node,
        args: &Args,
        kwargs: &Kwargs,
        offset: usize,
    ) -> FormulaResult<Value> {
        let callee = self.evaluate(callee)?;
        let args = self.eval_args(args)?;
        let kwargs = self.eval_kwargs(kwargs)?;
        callee.call(args, kwargs).map_err(|err| {
            crate::log_debug!("EVAL", "call at offset {} failed: {}", offset, err);
            err
        })
    }

    pub fn eval_args(&self, args: &Args) -> FormulaResult<Vec<Value>> {
        self.eval_all(&args.0)
    }

    pub fn eval_kwargs(&self, kwargs: &Kwargs) -> FormulaResult<NamedArgs> {
        kwargs
            .0
            .iter()
            .map(|(name, node)| self.evaluate(node).map(|value| (name.as_str(), value)))
            .collect()
    }
}

impl Node {
    /// Evaluates this node with the given evaluator.
    pub fn evaluate(&self, evaluator: &Evaluator<'_>) -> FormulaResult<Value> {
        evaluator.evaluate(self)
    }
}
