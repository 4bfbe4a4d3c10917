//! FILENAME: core/formula/src/ops.rs
//! PURPOSE: Semantics of the default operators.
//! CONTEXT: Each function here backs one default operator lexeme and one
//! operator-named builtin function (`add`, `mul`, `neg`, ...). Numbers follow
//! the usual dynamic-language rules: bools act as integers, integer
//! arithmetic is checked, and mixing ints with floats promotes to float.

use crate::error::{FormulaError, FormulaResult};
use crate::value::Value;
use std::cmp::Ordering;

/// Numeric operands after promotion.
enum Numbers {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numbers(a: &Value, b: &Value) -> Option<Numbers> {
    match (a.as_int(), b.as_int()) {
        (Some(x), Some(y)) => Some(Numbers::Ints(x, y)),
        _ => match (a.as_float(), b.as_float()) {
            (Some(x), Some(y)) => Some(Numbers::Floats(x, y)),
            _ => None,
        },
    }
}

fn unsupported(op: &str, a: &Value, b: &Value) -> FormulaError {
    FormulaError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        a.type_name(),
        b.type_name()
    ))
}

fn bad_operand(op: &str, a: &Value) -> FormulaError {
    FormulaError::type_error(format!("bad operand type for unary {}: '{}'", op, a.type_name()))
}

fn overflow() -> FormulaError {
    FormulaError::Arithmetic("integer overflow".to_string())
}

fn division_by_zero(message: &str) -> FormulaError {
    FormulaError::Arithmetic(message.to_string())
}

// ==================== Arithmetic ====================

pub fn add(a: Value, b: Value) -> FormulaResult<Value> {
    match numbers(&a, &b) {
        Some(Numbers::Ints(x, y)) => x.checked_add(y).map(Value::Int).ok_or_else(overflow),
        Some(Numbers::Floats(x, y)) => Ok(Value::Float(x + y)),
        None => match (a, b) {
            (Value::Str(x), Value::Str(y)) => Ok(Value::Str(x + &y)),
            (Value::List(mut x), Value::List(y)) => {
                x.extend(y);
                Ok(Value::List(x))
            }
            (Value::Tuple(mut x), Value::Tuple(y)) => {
                x.extend(y);
                Ok(Value::Tuple(x))
            }
            (a, b) => Err(unsupported("+", &a, &b)),
        },
    }
}

pub fn sub(a: Value, b: Value) -> FormulaResult<Value> {
    match numbers(&a, &b) {
        Some(Numbers::Ints(x, y)) => x.checked_sub(y).map(Value::Int).ok_or_else(overflow),
        Some(Numbers::Floats(x, y)) => Ok(Value::Float(x - y)),
        None => Err(unsupported("-", &a, &b)),
    }
}

pub fn mul(a: Value, b: Value) -> FormulaResult<Value> {
    match numbers(&a, &b) {
        Some(Numbers::Ints(x, y)) => x.checked_mul(y).map(Value::Int).ok_or_else(overflow),
        Some(Numbers::Floats(x, y)) => Ok(Value::Float(x * y)),
        None => match (a.as_int(), b.as_int()) {
            (None, Some(count)) if is_sequence(&a) => repeat(&a, count),
            (Some(count), None) if is_sequence(&b) => repeat(&b, count),
            _ => Err(unsupported("*", &a, &b)),
        },
    }
}

fn is_sequence(value: &Value) -> bool {
    matches!(value, Value::Str(_) | Value::List(_) | Value::Tuple(_))
}

/// Sequence repetition. The result is reserved up front, so a count no
/// allocator can satisfy is an error instead of an abort.
fn repeat(seq: &Value, count: i64) -> FormulaResult<Value> {
    let count = usize::try_from(count).unwrap_or(0);
    match seq {
        Value::Str(s) => {
            let total = s.len().checked_mul(count).ok_or_else(too_long)?;
            let mut repeated = String::new();
            repeated.try_reserve_exact(total).map_err(|_| too_long())?;
            if !s.is_empty() {
                for _ in 0..count {
                    repeated.push_str(s);
                }
            }
            Ok(Value::Str(repeated))
        }
        Value::List(items) | Value::Tuple(items) => {
            let total = items.len().checked_mul(count).ok_or_else(too_long)?;
            let mut repeated = Vec::new();
            repeated.try_reserve_exact(total).map_err(|_| too_long())?;
            if !items.is_empty() {
                for _ in 0..count {
                    repeated.extend(items.iter().cloned());
                }
            }
            Ok(if matches!(seq, Value::List(_)) {
                Value::List(repeated)
            } else {
                Value::Tuple(repeated)
            })
        }
        other => Err(FormulaError::type_error(format!(
            "can't multiply sequence of type '{}'",
            other.type_name()
        ))),
    }
}

fn too_long() -> FormulaError {
    FormulaError::Arithmetic("repeated sequence is too long".to_string())
}

/// True division always produces a float.
pub fn truediv(a: Value, b: Value) -> FormulaResult<Value> {
    match numbers(&a, &b) {
        Some(Numbers::Ints(x, y)) => {
            if y == 0 {
                return Err(division_by_zero("division by zero"));
            }
            Ok(Value::Float(x as f64 / y as f64))
        }
        Some(Numbers::Floats(x, y)) => {
            if y == 0.0 {
                return Err(division_by_zero("float division by zero"));
            }
            Ok(Value::Float(x / y))
        }
        None => Err(unsupported("/", &a, &b)),
    }
}

/// Division rounded towards negative infinity.
pub fn floordiv(a: Value, b: Value) -> FormulaResult<Value> {
    match numbers(&a, &b) {
        Some(Numbers::Ints(x, y)) => {
            if y == 0 {
                return Err(division_by_zero("integer division or modulo by zero"));
            }
            let q = x.checked_div(y).ok_or_else(overflow)?;
            let floored = if (x % y != 0) && ((x < 0) != (y < 0)) { q - 1 } else { q };
            Ok(Value::Int(floored))
        }
        Some(Numbers::Floats(x, y)) => {
            if y == 0.0 {
                return Err(division_by_zero("float floor division by zero"));
            }
            Ok(Value::Float((x / y).floor()))
        }
        None => Err(unsupported("//", &a, &b)),
    }
}

/// Remainder with the sign of the divisor.
pub fn modulo(a: Value, b: Value) -> FormulaResult<Value> {
    match numbers(&a, &b) {
        Some(Numbers::Ints(x, y)) => {
            if y == 0 {
                return Err(division_by_zero("integer division or modulo by zero"));
            }
            let r = x.checked_rem(y).ok_or_else(overflow)?;
            Ok(Value::Int(if r != 0 && ((r < 0) != (y < 0)) { r + y } else { r }))
        }
        Some(Numbers::Floats(x, y)) => {
            if y == 0.0 {
                return Err(division_by_zero("float modulo"));
            }
            let r = x % y;
            Ok(Value::Float(if r != 0.0 && ((r < 0.0) != (y < 0.0)) { r + y } else { r }))
        }
        None => Err(unsupported("%", &a, &b)),
    }
}

/// Matrix multiplication has no meaning for the builtin value types.
pub fn matmul(a: Value, b: Value) -> FormulaResult<Value> {
    Err(unsupported("@", &a, &b))
}

pub fn power(a: Value, b: Value) -> FormulaResult<Value> {
    match numbers(&a, &b) {
        Some(Numbers::Ints(x, y)) if y >= 0 => {
            let exp = u32::try_from(y).map_err(|_| overflow())?;
            x.checked_pow(exp).map(Value::Int).ok_or_else(overflow)
        }
        Some(Numbers::Ints(x, y)) => float_power(x as f64, y as f64),
        Some(Numbers::Floats(x, y)) => float_power(x, y),
        None => Err(unsupported("**", &a, &b)),
    }
}

fn float_power(x: f64, y: f64) -> FormulaResult<Value> {
    if x == 0.0 && y < 0.0 {
        return Err(division_by_zero("0.0 cannot be raised to a negative power"));
    }
    if x < 0.0 && y.fract() != 0.0 {
        return Err(FormulaError::Value(
            "negative number cannot be raised to a fractional power".to_string(),
        ));
    }
    Ok(Value::Float(x.powf(y)))
}

// ==================== Bitwise ====================

fn shift_count(op: &str, a: &Value, b: &Value) -> FormulaResult<(i64, u32)> {
    match (a.as_int(), b.as_int()) {
        (Some(_), Some(y)) if y < 0 => {
            Err(FormulaError::Value("negative shift count".to_string()))
        }
        (Some(x), Some(y)) => Ok((x, u32::try_from(y).unwrap_or(u32::MAX))),
        _ => Err(unsupported(op, a, b)),
    }
}

pub fn lshift(a: Value, b: Value) -> FormulaResult<Value> {
    let (x, n) = shift_count("<<", &a, &b)?;
    if x == 0 {
        return Ok(Value::Int(0));
    }
    let shifted = x.checked_shl(n).ok_or_else(overflow)?;
    // Shifting must be reversible, otherwise bits were lost.
    if shifted >> n != x {
        return Err(overflow());
    }
    Ok(Value::Int(shifted))
}

pub fn rshift(a: Value, b: Value) -> FormulaResult<Value> {
    let (x, n) = shift_count(">>", &a, &b)?;
    Ok(Value::Int(x >> n.min(63)))
}

fn bitwise(
    op: &str,
    a: Value,
    b: Value,
    bools: fn(bool, bool) -> bool,
    ints: fn(i64, i64) -> i64,
) -> FormulaResult<Value> {
    match (&a, &b) {
        (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(bools(*x, *y))),
        _ => match (a.as_int(), b.as_int()) {
            (Some(x), Some(y)) => Ok(Value::Int(ints(x, y))),
            _ => Err(unsupported(op, &a, &b)),
        },
    }
}

pub fn bit_and(a: Value, b: Value) -> FormulaResult<Value> {
    bitwise("&", a, b, |x, y| x & y, |x, y| x & y)
}

pub fn bit_or(a: Value, b: Value) -> FormulaResult<Value> {
    bitwise("|", a, b, |x, y| x | y, |x, y| x | y)
}

pub fn bit_xor(a: Value, b: Value) -> FormulaResult<Value> {
    bitwise("^", a, b, |x, y| x ^ y, |x, y| x ^ y)
}

// ==================== Comparison ====================

/// Orders two values. `Ok(None)` means the values are unordered (NaN involved).
pub fn ordering(op: &str, a: &Value, b: &Value) -> FormulaResult<Option<Ordering>> {
    if let Some(nums) = numbers(a, b) {
        return Ok(match nums {
            Numbers::Ints(x, y) => Some(x.cmp(&y)),
            Numbers::Floats(x, y) => x.partial_cmp(&y),
        });
    }
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Some(x.cmp(y))),
        (Value::List(x), Value::List(y)) | (Value::Tuple(x), Value::Tuple(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                if left != right {
                    return ordering(op, left, right);
                }
            }
            Ok(Some(x.len().cmp(&y.len())))
        }
        _ => Err(FormulaError::type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op,
            a.type_name(),
            b.type_name()
        ))),
    }
}

pub fn lt(a: Value, b: Value) -> FormulaResult<Value> {
    Ok(Value::Bool(ordering("<", &a, &b)? == Some(Ordering::Less)))
}

pub fn le(a: Value, b: Value) -> FormulaResult<Value> {
    let ord = ordering("<=", &a, &b)?;
    Ok(Value::Bool(matches!(ord, Some(Ordering::Less | Ordering::Equal))))
}

pub fn gt(a: Value, b: Value) -> FormulaResult<Value> {
    Ok(Value::Bool(ordering(">", &a, &b)? == Some(Ordering::Greater)))
}

pub fn ge(a: Value, b: Value) -> FormulaResult<Value> {
    let ord = ordering(">=", &a, &b)?;
    Ok(Value::Bool(matches!(ord, Some(Ordering::Greater | Ordering::Equal))))
}

pub fn eq(a: Value, b: Value) -> FormulaResult<Value> {
    Ok(Value::Bool(a == b))
}

pub fn ne(a: Value, b: Value) -> FormulaResult<Value> {
    Ok(Value::Bool(a != b))
}

// ==================== Unary ====================

pub fn neg(a: Value) -> FormulaResult<Value> {
    match a {
        Value::Float(x) => Ok(Value::Float(-x)),
        ref other => match other.as_int() {
            Some(x) => x.checked_neg().map(Value::Int).ok_or_else(overflow),
            None => Err(bad_operand("-", other)),
        },
    }
}

pub fn pos(a: Value) -> FormulaResult<Value> {
    match a {
        Value::Float(x) => Ok(Value::Float(x)),
        ref other => match other.as_int() {
            Some(x) => Ok(Value::Int(x)),
            None => Err(bad_operand("+", other)),
        },
    }
}

pub fn invert(a: Value) -> FormulaResult<Value> {
    match a.as_int() {
        Some(x) => Ok(Value::Int(!x)),
        None => Err(bad_operand("~", &a)),
    }
}

pub fn absolute(a: Value) -> FormulaResult<Value> {
    match a {
        Value::Float(x) => Ok(Value::Float(x.abs())),
        ref other => match other.as_int() {
            Some(x) => x.checked_abs().map(Value::Int).ok_or_else(overflow),
            None => Err(FormulaError::type_error(format!(
                "bad operand type for abs(): '{}'",
                other.type_name()
            ))),
        },
    }
}
