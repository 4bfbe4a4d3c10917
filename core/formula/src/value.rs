//! FILENAME: core/formula/src/value.rs
//! PURPOSE: Runtime values produced by evaluating a formula.
//! CONTEXT: Values flow between the evaluator, the operator callables and the
//! registered functions. Host applications plug their own structures in
//! through `HostObject` and their own behavior through `Callable`.
//!
//! SUPPORTED VALUES:
//! - Scalars: None, bool, int (i64), float (f64), str
//! - Containers: tuple, list, map (string keys, used for attributes and keys)
//! - Slice descriptors produced by `a:b:c` subscripts and `slice()`
//! - First-class functions and embedder-defined objects

use crate::error::{FormulaError, FormulaResult};
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// CALLABLES
// ============================================================================

/// Capability interface for anything the formula can call.
/// Any `Fn(Vec<Value>, NamedArgs) -> FormulaResult<Value>` closure implements it.
pub trait Callable: Send + Sync {
    fn call(&self, args: Vec<Value>, kwargs: NamedArgs) -> FormulaResult<Value>;
}

impl<F> Callable for F
where
    F: Fn(Vec<Value>, NamedArgs) -> FormulaResult<Value> + Send + Sync,
{
    fn call(&self, args: Vec<Value>, kwargs: NamedArgs) -> FormulaResult<Value> {
        self(args, kwargs)
    }
}

/// A named callable value.
#[derive(Clone)]
pub struct Function {
    name: Arc<str>,
    inner: Arc<dyn Callable>,
}

impl Function {
    pub fn new(name: &str, callable: impl Callable + 'static) -> Self {
        Function {
            name: Arc::from(name),
            inner: Arc::new(callable),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: Vec<Value>, kwargs: NamedArgs) -> FormulaResult<Value> {
        self.inner.call(args, kwargs)
    }

    /// True when both handles point at the same callable.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

/// Embedder-defined value with host-level member lookup, indexing and calls.
/// Every hook fails by default, so implementors only override what they support.
pub trait HostObject: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    fn get_attr(&self, _name: &str) -> Option<Value> {
        None
    }

    fn get_item(&self, _key: &Value) -> FormulaResult<Value> {
        Err(FormulaError::type_error(format!(
            "'{}' object is not subscriptable",
            self.type_name()
        )))
    }

    fn call(&self, _args: Vec<Value>, _kwargs: NamedArgs) -> FormulaResult<Value> {
        Err(FormulaError::type_error(format!(
            "'{}' object is not callable",
            self.type_name()
        )))
    }
}

/// Keyword arguments of a call, in declaration order, with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedArgs(Vec<(String, Value)>);

impl NamedArgs {
    pub fn new() -> Self {
        NamedArgs(Vec::new())
    }

    /// Appends an argument. The parser guarantees names are unique.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.0.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl IntoIterator for NamedArgs {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for NamedArgs {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        NamedArgs(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ============================================================================
// SLICES
// ============================================================================

/// A slice descriptor. Components are arbitrary values until they are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceValue {
    pub start: Value,
    pub stop: Value,
    pub step: Value,
}

impl SliceValue {
    pub fn new(start: Value, stop: Value, step: Value) -> Self {
        SliceValue { start, stop, step }
    }

    /// Resolves the slice against a sequence length and returns the selected positions.
    pub fn positions(&self, len: usize) -> FormulaResult<Vec<usize>> {
        let len = i64::try_from(len)
            .map_err(|_| FormulaError::Index("sequence is too large to slice".to_string()))?;

        let step = match slice_index(&self.step)? {
            None => 1,
            Some(0) => return Err(FormulaError::Value("slice step cannot be zero".to_string())),
            Some(step) => step,
        };

        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };
        let clamp = |bound: Option<i64>, default: i64| match bound {
            None => default,
            Some(b) if b < 0 => (b + len).max(lower),
            Some(b) => b.min(upper),
        };
        let start = clamp(slice_index(&self.start)?, if step < 0 { upper } else { lower });
        let stop = clamp(slice_index(&self.stop)?, if step < 0 { lower } else { upper });

        let mut positions = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            positions.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
        Ok(positions)
    }
}

fn slice_index(value: &Value) -> FormulaResult<Option<i64>> {
    match value {
        Value::None => Ok(None),
        other => other.as_int().map(Some).ok_or_else(|| {
            FormulaError::type_error("slice indices must be integers or None")
        }),
    }
}

// ============================================================================
// VALUE
// ============================================================================

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Slice(Box<SliceValue>),
    Function(Function),
    Object(Arc<dyn HostObject>),
}

impl Value {
    /// Wraps a closure as a first-class function value.
    pub fn function<F>(name: &str, func: F) -> Self
    where
        F: Fn(Vec<Value>, NamedArgs) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        Value::Function(Function::new(name, func))
    }

    pub fn object(object: impl HostObject + 'static) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Builds a map value, e.g. a namespace of functions reachable through attributes.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Slice(_) => "slice",
            Value::Function(_) => "function",
            Value::Object(obj) => obj.type_name(),
        }
    }

    /// Integer view of the value; bools count as integers.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Float view of any numeric value.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Object(_))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Tuple(items) | Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Slice(_) | Value::Function(_) | Value::Object(_) => true,
        }
    }

    /// Materializes the items of an iterable value.
    pub fn iterate(&self) -> FormulaResult<Vec<Value>> {
        match self {
            Value::Tuple(items) | Value::List(items) => Ok(items.clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Map(map) => Ok(map.keys().map(|k| Value::Str(k.clone())).collect()),
            other => Err(FormulaError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    /// Looks up a single property by name.
    pub fn get_attr(&self, name: &str) -> FormulaResult<Value> {
        let found = match self {
            Value::Map(map) => map.get(name).cloned(),
            Value::Object(obj) => obj.get_attr(name),
            _ => None,
        };
        found.ok_or_else(|| {
            FormulaError::Attribute(format!(
                "'{}' object has no attribute '{}'",
                self.type_name(),
                name
            ))
        })
    }

    /// Applies an index, key or slice to the value.
    pub fn get_item(&self, index: &Value) -> FormulaResult<Value> {
        match self {
            Value::List(items) => {
                sequence_item(items, index, "list").map(|r| r.map_or_else(|v| v, Value::List))
            }
            Value::Tuple(items) => {
                sequence_item(items, index, "tuple").map(|r| r.map_or_else(|v| v, Value::Tuple))
            }
            Value::Str(s) => string_item(s, index),
            Value::Map(map) => {
                let found = index.as_str().and_then(|key| map.get(key));
                found.cloned().ok_or_else(|| FormulaError::Key(index.to_string()))
            }
            Value::Object(obj) => obj.get_item(index),
            other => Err(FormulaError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            ))),
        }
    }

    /// Invokes a callable value with positional values followed by named values.
    pub fn call(&self, args: Vec<Value>, kwargs: NamedArgs) -> FormulaResult<Value> {
        match self {
            Value::Function(func) => func.call(args, kwargs),
            Value::Object(obj) => obj.call(args, kwargs),
            other => Err(FormulaError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }
}

/// Returns `Err(item)` for a single index and `Ok(items)` for a slice, so the
/// caller can rebuild the right container type.
fn sequence_item(
    items: &[Value],
    index: &Value,
    type_name: &str,
) -> FormulaResult<Result<Vec<Value>, Value>> {
    match index {
        Value::Slice(slice) => {
            let positions = slice.positions(items.len())?;
            Ok(Ok(positions.into_iter().map(|i| items[i].clone()).collect()))
        }
        other => {
            let Some(i) = other.as_int() else {
                return Err(FormulaError::type_error(format!(
                    "{} indices must be integers or slices, not {}",
                    type_name,
                    other.type_name()
                )));
            };
            let position = normalize_index(i, items.len()).ok_or_else(|| {
                FormulaError::Index(format!("{} index out of range", type_name))
            })?;
            Ok(Err(items[position].clone()))
        }
    }
}

fn string_item(s: &str, index: &Value) -> FormulaResult<Value> {
    let chars: Vec<char> = s.chars().collect();
    match index {
        Value::Slice(slice) => {
            let positions = slice.positions(chars.len())?;
            Ok(Value::Str(positions.into_iter().map(|i| chars[i]).collect()))
        }
        other => {
            let Some(i) = other.as_int() else {
                return Err(FormulaError::type_error(format!(
                    "string indices must be integers, not {}",
                    other.type_name()
                )));
            };
            let position = normalize_index(i, chars.len())
                .ok_or_else(|| FormulaError::Index("string index out of range".to_string()))?;
            Ok(Value::Str(chars[position].to_string()))
        }
    }
}

/// Maps a possibly negative index onto `0..len`.
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

// ============================================================================
// EQUALITY
// ============================================================================

/// Equality with numeric promotion: `1 == 1.0` and `True == 1`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) | (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Slice(a), Value::Slice(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (a, b) => match (a.as_int(), b.as_int()) {
                (Some(x), Some(y)) => x == y,
                _ => match (a.as_float(), b.as_float()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                },
            },
        }
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Value::Function(func)
    }
}

impl From<SliceValue> for Value {
    fn from(slice: SliceValue) -> Self {
        Value::Slice(Box::new(slice))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Tuple(items) | Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Slice(slice) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&slice.start)?;
                seq.serialize_element(&slice.stop)?;
                seq.serialize_element(&slice.step)?;
                seq.end()
            }
            Value::Function(_) | Value::Object(_) => Err(S::Error::custom(format!(
                "cannot serialize a value of type '{}'",
                self.type_name()
            ))),
        }
    }
}

// ============================================================================
// DISPLAY
// ============================================================================

/// Formats a float so that integral values keep a trailing `.0`.
pub fn format_float(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if n != 0.0 && (n.abs() >= 1e16 || n.abs() < 1e-4) {
        format!("{:e}", n)
    } else if n.fract() == 0.0 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "'")?;
    for c in s.chars() {
        match c {
            '\'' => write!(f, "\\'")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "'")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::Str(s) => write_quoted(f, s),
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_quoted(f, key)?;
                    write!(f, ": {}", value)?;
                }
                write!(f, "}}")
            }
            Value::Slice(slice) => {
                write!(f, "slice({}, {}, {})", slice.start, slice.stop, slice.step)
            }
            Value::Function(func) => write!(f, "<function {}>", func.name()),
            Value::Object(obj) => write!(f, "<{} object>", obj.type_name()),
        }
    }
}
