//! Binary operator dispatch.
//!
//! Kernels are looked up once, at compile time, by `(operator, nature)`.
//! Null operands are handled before a kernel runs: equality yields null,
//! every other operator fails.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use super::value::Value;
use crate::error::{Error, ErrorKind, Result};
use crate::semantic::Operator;
use crate::types::Nature;

pub type BinaryFn = fn(&Value, &Value) -> Result<Value>;

/// A resolved operator implementation.
#[derive(Clone, Copy)]
pub struct BinaryKernel {
    pub op: Operator,
    pub nature: Nature,
    func: BinaryFn,
}

impl BinaryKernel {
    pub fn apply(&self, left: &Value, right: &Value) -> Result<Value> {
        if left.is_null() || right.is_null() {
            if self.op.is_equality() {
                return Ok(Value::typed_null(Nature::Bool));
            }
            return Err(Error::null_access(format!(
                "operator {} applied to a null {}",
                self.op, self.nature
            )));
        }
        (self.func)(left, right)
    }
}

impl fmt::Debug for BinaryKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.op, self.nature)
    }
}

impl PartialEq for BinaryKernel {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op && self.nature == other.nature
    }
}

#[derive(Default)]
pub struct OperatorTable {
    entries: HashMap<(Operator, Nature), BinaryFn>,
}

impl fmt::Debug for OperatorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}

static BUILTIN: LazyLock<OperatorTable> = LazyLock::new(OperatorTable::with_builtins);

impl OperatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table of built-in operators.
    pub fn builtin() -> &'static OperatorTable {
        &BUILTIN
    }

    pub fn register(&mut self, op: Operator, nature: Nature, func: BinaryFn) {
        self.entries.insert((op, nature), func);
    }

    pub fn lookup(&self, op: Operator, nature: Nature) -> Option<BinaryKernel> {
        self.entries
            .get(&(op, nature))
            .map(|func| BinaryKernel { op, nature, func: *func })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn with_builtins() -> Self {
        use Operator::*;

        let mut table = Self::new();

        table.register(Add, Nature::Int, |l, r| int(l, r, |a, b| Ok(a.wrapping_add(b))));
        table.register(Sub, Nature::Int, |l, r| int(l, r, |a, b| Ok(a.wrapping_sub(b))));
        table.register(Mul, Nature::Int, |l, r| int(l, r, |a, b| Ok(a.wrapping_mul(b))));
        table.register(Div, Nature::Int, |l, r| {
            int(l, r, |a, b| a.checked_div(b).ok_or(ErrorKind::DivideByZero.into()))
        });
        table.register(Mod, Nature::Int, |l, r| {
            int(l, r, |a, b| a.checked_rem(b).ok_or(ErrorKind::DivideByZero.into()))
        });
        table.register(Pow, Nature::Int, |l, r| int(l, r, |a, b| Ok(int_pow(a, b))));

        table.register(Add, Nature::UInt, |l, r| uint(l, r, |a, b| Ok(a.wrapping_add(b))));
        table.register(Sub, Nature::UInt, |l, r| uint(l, r, |a, b| Ok(a.wrapping_sub(b))));
        table.register(Mul, Nature::UInt, |l, r| uint(l, r, |a, b| Ok(a.wrapping_mul(b))));
        table.register(Div, Nature::UInt, |l, r| {
            uint(l, r, |a, b| a.checked_div(b).ok_or(ErrorKind::DivideByZero.into()))
        });
        table.register(Mod, Nature::UInt, |l, r| {
            uint(l, r, |a, b| a.checked_rem(b).ok_or(ErrorKind::DivideByZero.into()))
        });
        table.register(Pow, Nature::UInt, |l, r| {
            uint(l, r, |a, b| Ok(a.wrapping_pow(u32::try_from(b).unwrap_or(u32::MAX))))
        });

        table.register(Add, Nature::Float, |l, r| float(l, r, |a, b| a + b));
        table.register(Sub, Nature::Float, |l, r| float(l, r, |a, b| a - b));
        table.register(Mul, Nature::Float, |l, r| float(l, r, |a, b| a * b));
        table.register(Div, Nature::Float, |l, r| float(l, r, |a, b| a / b));
        table.register(Mod, Nature::Float, |l, r| float(l, r, |a, b| a % b));
        table.register(Pow, Nature::Float, |l, r| float(l, r, f64::powf));

        table.register(Add, Nature::String, |l, r| {
            let (a, b) = strings(l, r)?;
            Ok(Value::new_string(format!("{}{}", a, b)))
        });
        table.register(Add, Nature::Duration, |l, r| {
            let (a, b) = scalars(l, r, Value::as_duration)?;
            Ok(Value::new_duration(a.wrapping_add(b)))
        });
        table.register(Sub, Nature::Duration, |l, r| {
            let (a, b) = scalars(l, r, Value::as_duration)?;
            Ok(Value::new_duration(a.wrapping_sub(b)))
        });

        for nature in [
            Nature::Int,
            Nature::UInt,
            Nature::Float,
            Nature::String,
            Nature::Time,
            Nature::Duration,
        ] {
            table.register(Less, nature, |l, r| compare(l, r, Ordering::is_lt));
            table.register(LessEq, nature, |l, r| compare(l, r, Ordering::is_le));
            table.register(Greater, nature, |l, r| compare(l, r, Ordering::is_gt));
            table.register(GreaterEq, nature, |l, r| compare(l, r, Ordering::is_ge));
        }
        for nature in [
            Nature::Bool,
            Nature::Int,
            Nature::UInt,
            Nature::Float,
            Nature::String,
            Nature::Time,
            Nature::Duration,
            Nature::Bytes,
            Nature::Null,
        ] {
            table.register(Eq, nature, |l, r| Ok(Value::new_bool(l == r)));
            table.register(NotEq, nature, |l, r| Ok(Value::new_bool(l != r)));
        }

        table.register(RegexMatch, Nature::String, |l, r| regex_match(l, r, true));
        table.register(NotRegexMatch, Nature::String, |l, r| regex_match(l, r, false));

        // Arithmetic on statically null operands always fails in `apply`.
        for op in [Add, Sub, Mul, Div, Mod, Pow, Less, LessEq, Greater, GreaterEq] {
            table.register(op, Nature::Null, |_, _| {
                Err(Error::null_access("operator applied to null"))
            });
        }

        table
    }
}

fn mismatch(l: &Value, r: &Value) -> Error {
    Error::internal(format!(
        "operands do not match their operator: {} and {}",
        l.nature(),
        r.nature()
    ))
}

fn scalars<T>(l: &Value, r: &Value, get: fn(&Value) -> Option<T>) -> Result<(T, T)> {
    match (get(l), get(r)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(mismatch(l, r)),
    }
}

fn int(l: &Value, r: &Value, f: impl Fn(i64, i64) -> Result<i64>) -> Result<Value> {
    let (a, b) = scalars(l, r, Value::as_int)?;
    f(a, b).map(Value::new_int)
}

fn uint(l: &Value, r: &Value, f: impl Fn(u64, u64) -> Result<u64>) -> Result<Value> {
    let (a, b) = scalars(l, r, Value::as_uint)?;
    f(a, b).map(Value::new_uint)
}

fn float(l: &Value, r: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
    let (a, b) = scalars(l, r, Value::as_float)?;
    Ok(Value::new_float(f(a, b)))
}

fn strings<'a>(l: &'a Value, r: &'a Value) -> Result<(&'a str, &'a str)> {
    match (l.as_str(), r.as_str()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(mismatch(l, r)),
    }
}

fn int_pow(base: i64, exp: i64) -> i64 {
    match u32::try_from(exp) {
        Ok(exp) => base.wrapping_pow(exp),
        Err(_) if exp < 0 => (base as f64).powf(exp as f64) as i64,
        Err(_) => base.wrapping_pow(u32::MAX),
    }
}

fn compare(l: &Value, r: &Value, test: fn(Ordering) -> bool) -> Result<Value> {
    let ordering = match l.nature() {
        Nature::Int => scalars(l, r, Value::as_int).map(|(a, b)| a.cmp(&b))?,
        Nature::UInt => scalars(l, r, Value::as_uint).map(|(a, b)| a.cmp(&b))?,
        Nature::Duration => scalars(l, r, Value::as_duration).map(|(a, b)| a.cmp(&b))?,
        Nature::Time => scalars(l, r, Value::as_time).map(|(a, b)| a.cmp(&b))?,
        Nature::String => strings(l, r).map(|(a, b)| a.cmp(b))?,
        Nature::Float => {
            let (a, b) = scalars(l, r, Value::as_float)?;
            match a.partial_cmp(&b) {
                Some(ordering) => ordering,
                None => return Ok(Value::new_bool(false)),
            }
        }
        _ => return Err(mismatch(l, r)),
    };
    Ok(Value::new_bool(test(ordering)))
}

fn regex_match(l: &Value, r: &Value, expect: bool) -> Result<Value> {
    match (l.as_str(), r.as_regexp()) {
        (Some(s), Some(re)) => Ok(Value::new_bool(re.is_match(s) == expect)),
        _ => Err(mismatch(l, r)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(op: Operator, nature: Nature, l: Value, r: Value) -> Result<Value> {
        OperatorTable::builtin()
            .lookup(op, nature)
            .expect("operator registered")
            .apply(&l, &r)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            eval(Operator::Add, Nature::Int, Value::new_int(5), Value::new_int(4)).unwrap(),
            Value::new_int(9)
        );
        assert_eq!(
            eval(Operator::Add, Nature::UInt, Value::new_uint(5), Value::new_uint(4)).unwrap(),
            Value::new_uint(9)
        );
        assert_eq!(
            eval(Operator::Add, Nature::Float, Value::new_float(5.0), Value::new_float(4.0)).unwrap(),
            Value::new_float(9.0)
        );
        assert_eq!(
            eval(Operator::Pow, Nature::Int, Value::new_int(2), Value::new_int(10)).unwrap(),
            Value::new_int(1024)
        );
        assert_eq!(
            eval(
                Operator::Add,
                Nature::String,
                Value::new_string("ab"),
                Value::new_string("cd")
            )
            .unwrap(),
            Value::new_string("abcd")
        );
    }

    #[test]
    fn test_integer_division_by_zero() {
        let err = eval(Operator::Div, Nature::Int, Value::new_int(1), Value::new_int(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivideByZero);
        let err = eval(Operator::Mod, Nature::UInt, Value::new_uint(1), Value::new_uint(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivideByZero);
    }

    #[test]
    fn test_null_equality_is_null() {
        let v = eval(
            Operator::Eq,
            Nature::Int,
            Value::typed_null(Nature::Int),
            Value::typed_null(Nature::Int),
        )
        .unwrap();
        assert!(v.is_null());
        let v = eval(
            Operator::NotEq,
            Nature::Int,
            Value::new_int(1),
            Value::typed_null(Nature::Int),
        )
        .unwrap();
        assert!(v.is_null());
    }

    #[test]
    fn test_null_arithmetic_fails() {
        let err = eval(
            Operator::Add,
            Nature::Int,
            Value::typed_null(Nature::Int),
            Value::new_int(1),
        )
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NullAccess(_)));
        let err = eval(
            Operator::Less,
            Nature::Float,
            Value::new_float(1.0),
            Value::typed_null(Nature::Float),
        )
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NullAccess(_)));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            eval(Operator::Less, Nature::String, Value::new_string("a"), Value::new_string("b")).unwrap(),
            Value::new_bool(true)
        );
        assert_eq!(
            eval(Operator::GreaterEq, Nature::Time, Value::new_time(5), Value::new_time(5)).unwrap(),
            Value::new_bool(true)
        );
        assert_eq!(
            eval(Operator::Eq, Nature::Float, Value::new_float(1.5), Value::new_float(1.5)).unwrap(),
            Value::new_bool(true)
        );
    }

    #[test]
    fn test_time_and_duration() {
        assert_eq!(
            eval(Operator::Sub, Nature::Duration, Value::new_duration(90), Value::new_duration(30)).unwrap(),
            Value::new_duration(60)
        );
        assert_eq!(
            eval(Operator::Add, Nature::Duration, Value::new_duration(90), Value::new_duration(30)).unwrap(),
            Value::new_duration(120)
        );
        assert_eq!(
            eval(Operator::Less, Nature::Time, Value::new_time(1), Value::new_time(2)).unwrap(),
            Value::new_bool(true)
        );
        assert_eq!(
            eval(Operator::Greater, Nature::Duration, Value::new_duration(1), Value::new_duration(2)).unwrap(),
            Value::new_bool(false)
        );
        // Time has no arithmetic: both operands of `+` share one type.
        assert!(OperatorTable::builtin().lookup(Operator::Add, Nature::Time).is_none());
    }

    #[test]
    fn test_regex_match() {
        let re = Value::regexp("^c.t$").unwrap();
        assert_eq!(
            eval(Operator::RegexMatch, Nature::String, Value::new_string("cat"), re.clone()).unwrap(),
            Value::new_bool(true)
        );
        assert_eq!(
            eval(Operator::NotRegexMatch, Nature::String, Value::new_string("cat"), re).unwrap(),
            Value::new_bool(false)
        );
    }

    #[test]
    fn test_unregistered_combination() {
        assert!(OperatorTable::builtin().lookup(Operator::Sub, Nature::String).is_none());
        assert!(OperatorTable::builtin().lookup(Operator::Add, Nature::Bool).is_none());
    }
}
