//! Standard functions: `size`, the numeric/string conversions, and the
//! string predicates.

use celvm_common::ValueKind::{Bool, Bytes, Double, Int, List, Map, String as Str, UInt};
use celvm_common::{EvalError, Span, Value};

use super::{double_of, int_of, mismatched, str_of, uint_of};
use crate::descriptor::Function;
use crate::error::RegistryError;
use crate::registry::RegistryBuilder;

// 2^63 and 2^64 are exactly representable; the open upper bounds keep
// truncation in range.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;
const U64_UPPER: f64 = 18_446_744_073_709_551_616.0;

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register_function(&size())?
        .register_function(&to_int())?
        .register_function(&to_uint())?
        .register_function(&to_double())?
        .register_function(&to_string())?
        .register_function(&string_predicate("contains", |s, t| s.contains(t)))?
        .register_function(&string_predicate("startsWith", |s, t| s.starts_with(t)))?
        .register_function(&string_predicate("endsWith", |s, t| s.ends_with(t)))?;
    Ok(())
}

fn size() -> Function {
    Function::new("size")
        .overload(&[Str], |args, span| {
            Ok(Value::Int(str_of(&args[0], span)?.chars().count() as i64))
        })
        .overload(&[Bytes], |args, span| match &args[0] {
            Value::Bytes(b) => Ok(Value::Int(b.len() as i64)),
            _ => Err(mismatched(span)),
        })
        .overload(&[List], |args, span| match &args[0] {
            Value::List(items) => Ok(Value::Int(items.len() as i64)),
            _ => Err(mismatched(span)),
        })
        .overload(&[Map], |args, span| match &args[0] {
            Value::Map(entries) => Ok(Value::Int(entries.len() as i64)),
            _ => Err(mismatched(span)),
        })
}

fn to_int() -> Function {
    Function::new("int")
        .overload(&[Int], |args, _| Ok(args[0].clone()))
        .overload(&[UInt], |args, span| {
            i64::try_from(uint_of(&args[0], span)?)
                .map(Value::Int)
                .map_err(|_| EvalError::overflow(span, "uint to int conversion"))
        })
        .overload(&[Double], |args, span| {
            let d = double_of(&args[0], span)?;
            if d.is_finite() && (I64_LOWER..I64_UPPER).contains(&d) {
                Ok(Value::Int(d.trunc() as i64))
            } else {
                Err(EvalError::overflow(span, "double to int conversion"))
            }
        })
        .overload(&[Str], |args, span| {
            let s = str_of(&args[0], span)?;
            s.parse::<i64>().map(Value::Int).map_err(|e| EvalError::InvalidArgument {
                span,
                reason: format!("cannot convert {s:?} to int: {e}"),
            })
        })
}

fn to_uint() -> Function {
    Function::new("uint")
        .overload(&[UInt], |args, _| Ok(args[0].clone()))
        .overload(&[Int], |args, span| {
            u64::try_from(int_of(&args[0], span)?)
                .map(Value::UInt)
                .map_err(|_| EvalError::overflow(span, "int to uint conversion"))
        })
        .overload(&[Double], |args, span| {
            let d = double_of(&args[0], span)?;
            if d.is_finite() && d > -1.0 && d < U64_UPPER {
                Ok(Value::UInt(d.trunc() as u64))
            } else {
                Err(EvalError::overflow(span, "double to uint conversion"))
            }
        })
        .overload(&[Str], |args, span| {
            let s = str_of(&args[0], span)?;
            s.parse::<u64>().map(Value::UInt).map_err(|e| EvalError::InvalidArgument {
                span,
                reason: format!("cannot convert {s:?} to uint: {e}"),
            })
        })
}

fn to_double() -> Function {
    Function::new("double")
        .overload(&[Double], |args, _| Ok(args[0].clone()))
        .overload(&[Int], |args, span| Ok(Value::Double(int_of(&args[0], span)? as f64)))
        .overload(&[UInt], |args, span| Ok(Value::Double(uint_of(&args[0], span)? as f64)))
        .overload(&[Str], |args, span| {
            let s = str_of(&args[0], span)?;
            s.parse::<f64>().map(Value::Double).map_err(|e| EvalError::InvalidArgument {
                span,
                reason: format!("cannot convert {s:?} to double: {e}"),
            })
        })
}

fn to_string() -> Function {
    Function::new("string")
        .overload(&[Str], |args, _| Ok(args[0].clone()))
        .overload(&[Int], |args, span| Ok(Value::String(int_of(&args[0], span)?.to_string())))
        .overload(&[UInt], |args, span| Ok(Value::String(uint_of(&args[0], span)?.to_string())))
        .overload(&[Double], |args, span| {
            Ok(Value::String(double_of(&args[0], span)?.to_string()))
        })
        .overload(&[Bool], |args, span| match args[0].as_bool() {
            Some(b) => Ok(Value::String(b.to_string())),
            None => Err(mismatched(span)),
        })
        .overload(&[Bytes], |args, span| match &args[0] {
            Value::Bytes(b) => String::from_utf8(b.clone())
                .map(Value::String)
                .map_err(|_| EvalError::InvalidArgument {
                    span,
                    reason: "bytes are not valid UTF-8".to_string(),
                }),
            _ => Err(mismatched(span)),
        })
}

/// A `(string, string) -> bool` method such as `"abc".contains("b")`.
fn string_predicate(name: &str, test: fn(&str, &str) -> bool) -> Function {
    Function::new(name).overload(&[Str, Str], move |args, span: Span| {
        Ok(Value::Bool(test(str_of(&args[0], span)?, str_of(&args[1], span)?)))
    })
}
