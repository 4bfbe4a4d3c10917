//! FILENAME: core/formula/src/functions.rs
//! PURPOSE: Registry of named functions and the builtin function set.
//! CONTEXT: Identifiers that are not found in the evaluation context are
//! resolved here. A fresh registry contains the builtins below; embedders add
//! their own callables through `register`.

use crate::error::{FormulaError, FormulaResult};
use crate::ops;
use crate::value::{Callable, Function, NamedArgs, SliceValue, Value};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::fmt;

#[derive(Clone)]
pub struct FunctionRegistry {
    functions: FxHashMap<String, Function>,
}

impl FunctionRegistry {
    /// Creates a registry pre-populated with the builtin functions.
    pub fn new() -> Self {
        let mut registry = FunctionRegistry::empty();

        registry.insert("abs", |args, kwargs| unary("abs", ops::absolute, args, kwargs));
        registry.insert("max", |args, kwargs| fn_extreme("max", Ordering::Greater, args, kwargs));
        registry.insert("min", |args, kwargs| fn_extreme("min", Ordering::Less, args, kwargs));
        registry.insert("sum", fn_sum);
        registry.insert("pow", fn_pow);
        registry.insert("slice", fn_slice);

        registry.insert("sin", |args, kwargs| math("sin", f64::sin, args, kwargs));
        registry.insert("cos", |args, kwargs| math("cos", f64::cos, args, kwargs));
        registry.insert("tan", |args, kwargs| math("tan", f64::tan, args, kwargs));
        registry.insert("exp", |args, kwargs| math("exp", f64::exp, args, kwargs));
        registry.insert("sqrt", fn_sqrt);
        registry.insert("log", fn_log);

        for (name, op) in OPERATOR_FUNCTIONS {
            registry.insert(name, move |args, kwargs| binary(name, op, args, kwargs));
        }
        for (name, op) in UNARY_OPERATOR_FUNCTIONS {
            registry.insert(name, move |args, kwargs| unary(name, op, args, kwargs));
        }
        registry
    }

    /// Creates a registry without any functions.
    pub fn empty() -> Self {
        FunctionRegistry {
            functions: FxHashMap::default(),
        }
    }

    fn insert<F>(&mut self, name: &str, func: F)
    where
        F: Fn(Vec<Value>, NamedArgs) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        self.insert_callable(name, func);
    }

    fn insert_callable(&mut self, name: &str, callable: impl Callable + 'static) {
        self.functions
            .insert(name.to_string(), Function::new(name, callable));
    }

    /// Registers a closure under a new identifier.
    pub fn register<F>(&mut self, name: &str, func: F) -> FormulaResult<()>
    where
        F: Fn(Vec<Value>, NamedArgs) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        self.register_callable(name, func)
    }

    /// Registers any `Callable` implementation under a new identifier.
    pub fn register_callable(
        &mut self,
        name: &str,
        callable: impl Callable + 'static,
    ) -> FormulaResult<()> {
        if !is_identifier(name) {
            return Err(FormulaError::Config(format!(
                "illegal function name '{}': names must match [A-Za-z_][A-Za-z0-9_]*",
                name
            )));
        }
        if self.functions.contains_key(name) {
            return Err(FormulaError::Config(format!(
                "function '{}' is already registered",
                name
            )));
        }
        crate::log_debug!("FUNC", "registered function '{}'", name);
        self.insert_callable(name, callable);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Resolves a name, failing with a name error when it is unknown.
    pub fn resolve(&self, name: &str) -> FormulaResult<&Function> {
        self.functions
            .get(name)
            .ok_or_else(|| FormulaError::name(format!("name '{}' is not defined", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// True for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

// ============================================================================
// ARGUMENT BINDING
// ============================================================================

/// Binds positional and keyword arguments onto named parameters.
/// The first `required` parameters must be supplied.
fn bind(
    func: &str,
    params: &[&str],
    required: usize,
    args: Vec<Value>,
    kwargs: NamedArgs,
) -> FormulaResult<Vec<Option<Value>>> {
    if args.len() > params.len() {
        return Err(FormulaError::type_error(format!(
            "{}() takes at most {} argument{} ({} given)",
            func,
            params.len(),
            if params.len() == 1 { "" } else { "s" },
            args.len()
        )));
    }

    let mut slots: Vec<Option<Value>> = args.into_iter().map(Some).collect();
    slots.resize(params.len(), None);

    for (name, value) in kwargs {
        let Some(index) = params.iter().position(|p| *p == name) else {
            return Err(FormulaError::type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                func, name
            )));
        };
        if slots[index].is_some() {
            return Err(FormulaError::type_error(format!(
                "{}() got multiple values for argument '{}'",
                func, name
            )));
        }
        slots[index] = Some(value);
    }

    if let Some(missing) = slots.iter().take(required).position(Option::is_none) {
        return Err(FormulaError::type_error(format!(
            "{}() missing required argument '{}'",
            func, params[missing]
        )));
    }
    Ok(slots)
}

fn required(slot: &mut Option<Value>) -> Value {
    slot.take().unwrap_or(Value::None)
}

fn to_float(func: &str, value: &Value) -> FormulaResult<f64> {
    value.as_float().ok_or_else(|| {
        FormulaError::type_error(format!(
            "{}() must be a real number, not '{}'",
            func,
            value.type_name()
        ))
    })
}

fn domain_error() -> FormulaError {
    FormulaError::Value("math domain error".to_string())
}

// ==================== Operator Functions ====================

type BinaryOp = fn(Value, Value) -> FormulaResult<Value>;
type UnaryOp = fn(Value) -> FormulaResult<Value>;

const OPERATOR_FUNCTIONS: [(&str, BinaryOp); 19] = [
    ("lt", ops::lt),
    ("le", ops::le),
    ("eq", ops::eq),
    ("ne", ops::ne),
    ("ge", ops::ge),
    ("gt", ops::gt),
    ("or_", ops::bit_or),
    ("xor", ops::bit_xor),
    ("and_", ops::bit_and),
    ("lshift", ops::lshift),
    ("rshift", ops::rshift),
    ("add", ops::add),
    ("sub", ops::sub),
    ("mul", ops::mul),
    ("truediv", ops::truediv),
    ("floordiv", ops::floordiv),
    ("mod", ops::modulo),
    ("matmul", ops::matmul),
    ("pow_", ops::power),
];

const UNARY_OPERATOR_FUNCTIONS: [(&str, UnaryOp); 3] =
    [("neg", ops::neg), ("pos", ops::pos), ("invert", ops::invert)];

fn binary(func: &str, op: BinaryOp, args: Vec<Value>, kwargs: NamedArgs) -> FormulaResult<Value> {
    let mut slots = bind(func, &["a", "b"], 2, args, kwargs)?;
    op(required(&mut slots[0]), required(&mut slots[1]))
}

fn unary(func: &str, op: UnaryOp, args: Vec<Value>, kwargs: NamedArgs) -> FormulaResult<Value> {
    let mut slots = bind(func, &["x"], 1, args, kwargs)?;
    op(required(&mut slots[0]))
}

// ==================== Aggregate Functions ====================

/// max/min over either one iterable or several positional values.
/// Supports the `key` and `default` keyword arguments.
fn fn_extreme(
    func: &str,
    wanted: Ordering,
    args: Vec<Value>,
    mut kwargs: NamedArgs,
) -> FormulaResult<Value> {
    let key = kwargs.remove("key").filter(|k| !k.is_none());
    let default = kwargs.remove("default");
    if let Some(name) = kwargs.names().next() {
        return Err(FormulaError::type_error(format!(
            "{}() got an unexpected keyword argument '{}'",
            func, name
        )));
    }

    let items = match args.len() {
        0 => {
            return Err(FormulaError::type_error(format!(
                "{} expected at least 1 argument, got 0",
                func
            )))
        }
        1 => args[0].iterate()?,
        _ if default.is_some() => {
            return Err(FormulaError::type_error(format!(
                "Cannot specify a default for {}() with multiple positional arguments",
                func
            )))
        }
        _ => args,
    };

    let symbol = if wanted == Ordering::Greater { ">" } else { "<" };
    let mut best: Option<(Value, Value)> = None;
    for item in items {
        let rank = match &key {
            Some(key) => key.call(vec![item.clone()], NamedArgs::new())?,
            None => item.clone(),
        };
        best = match best {
            Some((best_item, best_rank)) => {
                if ops::ordering(symbol, &rank, &best_rank)? == Some(wanted) {
                    Some((item, rank))
                } else {
                    Some((best_item, best_rank))
                }
            }
            None => Some((item, rank)),
        };
    }

    match (best, default) {
        (Some((item, _)), _) => Ok(item),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(FormulaError::Value(format!(
            "{}() arg is an empty sequence",
            func
        ))),
    }
}

fn fn_sum(args: Vec<Value>, kwargs: NamedArgs) -> FormulaResult<Value> {
    let mut slots = bind("sum", &["iterable", "start"], 1, args, kwargs)?;
    let items = required(&mut slots[0]).iterate()?;
    let start = slots[1].take().unwrap_or(Value::Int(0));
    if matches!(start, Value::Str(_)) {
        return Err(FormulaError::type_error(
            "sum() can't sum strings [use ''.join(seq) instead]",
        ));
    }
    items.into_iter().try_fold(start, ops::add)
}

// ==================== Math Functions ====================

fn fn_pow(args: Vec<Value>, kwargs: NamedArgs) -> FormulaResult<Value> {
    let mut slots = bind("pow", &["base", "exp", "mod"], 2, args, kwargs)?;
    let base = required(&mut slots[0]);
    let exp = required(&mut slots[1]);
    match slots[2].take().filter(|m| !m.is_none()) {
        None => ops::power(base, exp),
        Some(modulus) => {
            let (Some(b), Some(e), Some(m)) = (base.as_int(), exp.as_int(), modulus.as_int())
            else {
                return Err(FormulaError::type_error(
                    "pow() 3rd argument not allowed unless all arguments are integers",
                ));
            };
            modular_pow(b, e, m).map(Value::Int)
        }
    }
}

/// Square-and-multiply; the result takes the sign of the modulus.
fn modular_pow(base: i64, exp: i64, modulus: i64) -> FormulaResult<i64> {
    if modulus == 0 {
        return Err(FormulaError::Value("pow() 3rd argument cannot be 0".to_string()));
    }
    if exp < 0 {
        return Err(FormulaError::Value(
            "pow() negative exponent is not supported with a modulus".to_string(),
        ));
    }
    let m = i128::from(modulus).abs();
    let mut result: i128 = 1 % m;
    let mut b = i128::from(base).rem_euclid(m);
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result = result * b % m;
        }
        b = b * b % m;
        e >>= 1;
    }
    if modulus < 0 && result != 0 {
        result += i128::from(modulus);
    }
    i64::try_from(result).map_err(|_| FormulaError::Arithmetic("integer overflow".to_string()))
}

fn math(func: &str, f: fn(f64) -> f64, args: Vec<Value>, kwargs: NamedArgs) -> FormulaResult<Value> {
    let mut slots = bind(func, &["x"], 1, args, kwargs)?;
    let x = to_float(func, &required(&mut slots[0]))?;
    let result = f(x);
    if result.is_infinite() && x.is_finite() {
        return Err(FormulaError::Arithmetic("math range error".to_string()));
    }
    if result.is_nan() && !x.is_nan() {
        return Err(domain_error());
    }
    Ok(Value::Float(result))
}

fn fn_sqrt(args: Vec<Value>, kwargs: NamedArgs) -> FormulaResult<Value> {
    let mut slots = bind("sqrt", &["x"], 1, args, kwargs)?;
    let x = to_float("sqrt", &required(&mut slots[0]))?;
    if x < 0.0 {
        return Err(domain_error());
    }
    Ok(Value::Float(x.sqrt()))
}

/// Natural logarithm, or the logarithm in `base` when given.
fn fn_log(args: Vec<Value>, kwargs: NamedArgs) -> FormulaResult<Value> {
    let mut slots = bind("log", &["x", "base"], 1, args, kwargs)?;
    let x = to_float("log", &required(&mut slots[0]))?;
    if x <= 0.0 {
        return Err(domain_error());
    }
    match slots[1].take() {
        None => Ok(Value::Float(x.ln())),
        Some(base) => {
            let base = to_float("log", &base)?;
            if base <= 0.0 {
                return Err(domain_error());
            }
            if base == 1.0 {
                return Err(FormulaError::Arithmetic("float division by zero".to_string()));
            }
            Ok(Value::Float(x.ln() / base.ln()))
        }
    }
}

// ==================== Sequence Functions ====================

/// slice(stop), slice(start, stop) or slice(start, stop, step).
fn fn_slice(args: Vec<Value>, kwargs: NamedArgs) -> FormulaResult<Value> {
    if !kwargs.is_empty() {
        return Err(FormulaError::type_error("slice() takes no keyword arguments"));
    }
    let mut args = args.into_iter();
    let slice = match args.len() {
        0 => {
            return Err(FormulaError::type_error(
                "slice expected at least 1 argument, got 0",
            ))
        }
        1 => SliceValue::new(Value::None, args.next().unwrap_or(Value::None), Value::None),
        2 | 3 => {
            let start = args.next().unwrap_or(Value::None);
            let stop = args.next().unwrap_or(Value::None);
            let step = args.next().unwrap_or(Value::None);
            SliceValue::new(start, stop, step)
        }
        n => {
            return Err(FormulaError::type_error(format!(
                "slice expected at most 3 arguments, got {}",
                n
            )))
        }
    };
    Ok(Value::from(slice))
}
