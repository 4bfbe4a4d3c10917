//! FILENAME: core/formula/src/parser.rs
//! PURPOSE: Recursive descent parser for formulas, using precedence climbing.
//! CONTEXT: Converts the token stream into an AST. Binary precedence comes
//! from the operator registry, so custom operators slot into the same loop.
//!
//! GRAMMAR:
//!   expression := unary { binary_op expression(prec) }     while prec > min
//!   unary      := unary_op unary | primary
//!   primary    := atom { call | subscript | attribute }
//!   atom       := NUMBER | STRING | IDENTIFIER | group_or_tuple | list
//!
//! Every nesting step (right operand, unary operator, bracket, postfix)
//! consumes one unit of the depth budget, which bounds parser recursion and
//! the tree below any left spine. Folding an equal-precedence chain only
//! grows the left spine, which the evaluator, renderer and `Drop` walk with
//! loops, so `1 + 1 + ... + 1` is not limited by the budget.

use crate::ast::{Args, Kwargs, Node, NodeRef};
use crate::error::{FormulaError, FormulaResult};
use crate::lexer::Lexer;
use crate::operators::OperatorRegistry;
use crate::options::DEFAULT_MAX_DEPTH;
use crate::token::{Token, TokenKind};
use rustc_hash::FxHashMap;
use std::sync::Arc;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    operators: &'a OperatorRegistry,
    identifiers: FxHashMap<String, NodeRef>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    /// Tokenizes the input up front; lexer errors surface here.
    pub fn new(input: &str, operators: &'a OperatorRegistry) -> FormulaResult<Self> {
        let tokens = Lexer::new(input, operators).tokenize()?;
        Ok(Parser {
            tokens,
            position: 0,
            operators,
            identifiers: FxHashMap::default(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parses a complete expression. Trailing tokens are an error.
    pub fn parse(&mut self) -> FormulaResult<NodeRef> {
        crate::log_enter!("PARSE", "parse", "{} tokens", self.tokens.len());
        if self.current_kind() == &TokenKind::EOF {
            return Err(FormulaError::syntax("empty expression", self.current().offset));
        }
        let root = self.parse_expression(0)?;
        if self.current_kind() != &TokenKind::EOF {
            return Err(self.unexpected());
        }
        crate::log_exit!("PARSE", "parse", "{} shared identifiers", self.identifiers.len());
        Ok(root)
    }

    fn current(&self) -> &Token {
        // The stream always ends with EOF and the parser never advances past it.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self, ahead: usize) -> &TokenKind {
        let index = (self.position + ahead).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn unexpected(&self) -> FormulaError {
        let token = self.current();
        match token.kind {
            TokenKind::EOF => FormulaError::syntax("unexpected end of expression", token.offset),
            ref kind => FormulaError::syntax(format!("unexpected token '{}'", kind), token.offset),
        }
    }

    /// Consumes one unit of the depth budget.
    fn nest(&mut self, offset: usize) -> FormulaResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(FormulaError::syntax("expression is nested too deeply", offset));
        }
        Ok(())
    }

    /// Returns the shared node for an identifier name.
    fn identifier(&mut self, name: String) -> NodeRef {
        self.identifiers
            .entry(name)
            .or_insert_with_key(|name| Arc::new(Node::Identifier(name.clone())))
            .clone()
    }

    // ==================== Operators ====================

    /// Precedence climbing. Equal precedence folds into this loop, so chains
    /// group left to right.
    fn parse_expression(&mut self, min_precedence: i32) -> FormulaResult<NodeRef> {
        let saved_depth = self.depth;
        let mut left = self.parse_unary()?;

        while let TokenKind::Operator(op) = self.current_kind() {
            let op = op.clone();
            let offset = self.current().offset;
            let precedence = self.operators.precedence(&op).ok_or_else(|| {
                FormulaError::name_at(format!("'{}' is not a binary operator", op), offset)
            })?;
            if precedence <= min_precedence {
                break;
            }
            self.nest(offset)?;
            self.advance();
            let right = self.parse_expression(precedence)?;
            self.depth = saved_depth;
            left = Arc::new(Node::BinaryOp {
                op,
                left,
                right,
                offset,
            });
        }

        self.depth = saved_depth;
        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<NodeRef> {
        let TokenKind::Operator(op) = self.current_kind() else {
            return self.parse_primary();
        };
        let op = op.clone();
        let offset = self.current().offset;
        if !self.operators.is_unary(&op) {
            return Err(FormulaError::name_at(
                format!("'{}' is not a unary operator", op),
                offset,
            ));
        }

        let saved_depth = self.depth;
        self.nest(offset)?;
        self.advance();
        let operand = self.parse_unary()?;
        self.depth = saved_depth;
        Ok(Arc::new(Node::UnaryOp {
            op,
            operand,
            offset,
        }))
    }

    // ==================== Primaries ====================

    fn parse_primary(&mut self) -> FormulaResult<NodeRef> {
        let token = self.current().clone();
        let atom = match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Arc::new(Node::Number(n))
            }
            TokenKind::String(s) => {
                self.advance();
                Arc::new(Node::Str(s))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                self.identifier(name)
            }
            TokenKind::LParen => self.parse_group(token.offset)?,
            TokenKind::LSquare => self.parse_list(token.offset)?,
            _ => return Err(self.unexpected()),
        };
        self.parse_postfix(atom)
    }

    /// Applies calls, subscripts and attribute chains to any primary.
    fn parse_postfix(&mut self, mut node: NodeRef) -> FormulaResult<NodeRef> {
        let saved_depth = self.depth;
        loop {
            let offset = self.current().offset;
            node = match self.current_kind() {
                TokenKind::LParen => {
                    self.nest(offset)?;
                    self.parse_call(node, offset)?
                }
                TokenKind::LSquare => {
                    self.nest(offset)?;
                    self.parse_subscript(node, offset)?
                }
                TokenKind::Attribute(names) => {
                    let names = names.clone();
                    self.nest(offset)?;
                    self.advance();
                    Arc::new(Node::Attribute {
                        object: node,
                        names,
                    })
                }
                TokenKind::Number(_) | TokenKind::String(_) | TokenKind::Identifier(_) => {
                    return Err(self.unexpected())
                }
                _ => break,
            };
        }
        self.depth = saved_depth;
        Ok(node)
    }

    /// `(e)` groups, `(e,)` and `(e1, e2)` build tuples, `()` is rejected.
    fn parse_group(&mut self, start: usize) -> FormulaResult<NodeRef> {
        let saved_depth = self.depth;
        self.nest(start)?;
        self.advance();

        if self.current_kind() == &TokenKind::RParen {
            return Err(FormulaError::syntax(
                "empty parentheses are not an expression",
                start,
            ));
        }

        let mut elements = Vec::new();
        let mut trailing_comma = false;
        loop {
            elements.push(self.parse_expression(0)?);
            match self.current_kind() {
                TokenKind::Comma => {
                    self.advance();
                    if self.current_kind() == &TokenKind::RParen {
                        trailing_comma = true;
                        break;
                    }
                }
                TokenKind::RParen => break,
                TokenKind::Assignment => {
                    return Err(FormulaError::syntax(
                        "keyword arguments are only allowed in calls",
                        self.current().offset,
                    ))
                }
                TokenKind::EOF => return Err(FormulaError::syntax("unmatched '('", start)),
                _ => return Err(self.unexpected()),
            }
        }
        self.advance(); // ')'
        self.depth = saved_depth;

        if elements.len() == 1 && !trailing_comma {
            Ok(elements.remove(0))
        } else {
            Ok(Arc::new(Node::Tuple(elements)))
        }
    }

    /// `[e1, e2, ...]`. Empty lists and a trailing comma are allowed.
    fn parse_list(&mut self, start: usize) -> FormulaResult<NodeRef> {
        let saved_depth = self.depth;
        self.nest(start)?;
        self.advance();

        let mut elements = Vec::new();
        while self.current_kind() != &TokenKind::RSquare {
            elements.push(self.parse_expression(0)?);
            match self.current_kind() {
                TokenKind::Comma => self.advance(),
                TokenKind::RSquare => break,
                TokenKind::Colon => {
                    return Err(FormulaError::syntax(
                        "slices are only allowed in subscripts",
                        self.current().offset,
                    ))
                }
                TokenKind::EOF => return Err(FormulaError::syntax("unmatched '['", start)),
                _ => return Err(self.unexpected()),
            }
        }
        self.advance(); // ']'
        self.depth = saved_depth;
        Ok(Arc::new(Node::List(elements)))
    }

    // ==================== Postfix ====================

    /// Call arguments: positional first, then `name=value` keywords.
    fn parse_call(&mut self, callee: NodeRef, start: usize) -> FormulaResult<NodeRef> {
        self.advance(); // '('
        let mut args = Args::default();
        let mut kwargs = Kwargs::default();

        while self.current_kind() != &TokenKind::RParen {
            let arg_offset = self.current().offset;

            if let (TokenKind::Identifier(name), TokenKind::Assignment) =
                (self.current_kind(), self.peek_kind(1))
            {
                let name = name.clone();
                if kwargs.0.iter().any(|(existing, _)| *existing == name) {
                    return Err(FormulaError::syntax(
                        format!("keyword argument repeated: {}", name),
                        arg_offset,
                    ));
                }
                self.advance();
                self.advance();
                let value = self.parse_expression(0)?;
                kwargs.0.push((name, value));
            } else {
                let value = self.parse_expression(0)?;
                if self.current_kind() == &TokenKind::Assignment {
                    return Err(FormulaError::syntax(
                        "expression cannot be used as a keyword argument name",
                        self.current().offset,
                    ));
                }
                if !kwargs.0.is_empty() {
                    return Err(FormulaError::syntax(
                        "positional argument after keyword argument",
                        arg_offset,
                    ));
                }
                args.0.push(value);
            }

            match self.current_kind() {
                TokenKind::Comma => self.advance(),
                TokenKind::RParen => break,
                TokenKind::EOF => return Err(FormulaError::syntax("unmatched '('", start)),
                _ => return Err(self.unexpected()),
            }
        }
        self.advance(); // ')'

        Ok(Arc::new(Node::Call {
            callee,
            args,
            kwargs,
            offset: start,
        }))
    }

    /// `object[index]`, `object[i, j]` or `object[start:stop:step]`.
    fn parse_subscript(&mut self, object: NodeRef, start: usize) -> FormulaResult<NodeRef> {
        self.advance(); // '['
        if self.current_kind() == &TokenKind::RSquare {
            return Err(FormulaError::syntax("empty subscript", start));
        }

        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            items.push(self.parse_subscript_item()?);
            match self.current_kind() {
                TokenKind::Comma => {
                    self.advance();
                    if self.current_kind() == &TokenKind::RSquare {
                        trailing_comma = true;
                        break;
                    }
                }
                TokenKind::RSquare => break,
                TokenKind::EOF => return Err(FormulaError::syntax("unmatched '['", start)),
                _ => return Err(self.unexpected()),
            }
        }
        self.advance(); // ']'

        let index = if items.len() == 1 && !trailing_comma {
            items.remove(0)
        } else {
            Arc::new(Node::Tuple(items))
        };
        Ok(Arc::new(Node::Item { object, index }))
    }

    /// A single index expression, or a slice with up to three components.
    fn parse_subscript_item(&mut self) -> FormulaResult<NodeRef> {
        let start = self.current().offset;
        let mut components: Vec<Option<NodeRef>> = Vec::new();
        let mut component: Option<NodeRef> = None;

        loop {
            match self.current_kind() {
                TokenKind::Colon => {
                    if components.len() == 2 {
                        return Err(FormulaError::syntax(
                            "slice takes at most three components",
                            self.current().offset,
                        ));
                    }
                    components.push(component.take());
                    self.advance();
                }
                TokenKind::Comma | TokenKind::RSquare | TokenKind::EOF => break,
                _ if component.is_some() => return Err(self.unexpected()),
                _ => component = Some(self.parse_expression(0)?),
            }
        }

        if components.is_empty() {
            return component.ok_or_else(|| FormulaError::syntax("empty subscript", start));
        }
        components.push(component);

        let mut parts = components
            .into_iter()
            .map(|part| part.unwrap_or_else(|| Arc::new(Node::NoneLiteral)));
        let none = || Arc::new(Node::NoneLiteral);
        Ok(Arc::new(Node::Slice {
            start: parts.next().unwrap_or_else(none),
            stop: parts.next().unwrap_or_else(none),
            step: parts.next().unwrap_or_else(none),
        }))
    }
}

/// Parses `input` with the given operators and the default depth budget.
pub fn parse(input: &str, operators: &OperatorRegistry) -> FormulaResult<NodeRef> {
    Parser::new(input, operators)?.parse()
}
