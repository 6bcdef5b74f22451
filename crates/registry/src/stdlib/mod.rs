//! The standard operator and function set.
//!
//! Everything here goes through the same descriptor contract as host
//! extensions; nothing is special-cased by the VM.

mod functions;
mod operators;

use celvm_common::{EvalError, Span, Value};

use crate::error::RegistryError;
use crate::registry::RegistryBuilder;

/// Register the standard operators and functions into `builder`.
pub fn register_standard(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    operators::register(builder)?;
    functions::register(builder)?;
    Ok(())
}

/// A handler was reached with operand kinds its registration excludes.
fn mismatched(span: Span) -> EvalError {
    EvalError::internal(span, "handler invoked with unregistered operand kinds")
}

fn int_of(v: &Value, span: Span) -> Result<i64, EvalError> {
    match v {
        Value::Int(i) => Ok(*i),
        _ => Err(mismatched(span)),
    }
}

fn uint_of(v: &Value, span: Span) -> Result<u64, EvalError> {
    match v {
        Value::UInt(u) => Ok(*u),
        _ => Err(mismatched(span)),
    }
}

fn double_of(v: &Value, span: Span) -> Result<f64, EvalError> {
    match v {
        Value::Double(d) => Ok(*d),
        _ => Err(mismatched(span)),
    }
}

fn str_of(v: &Value, span: Span) -> Result<&str, EvalError> {
    match v {
        Value::String(s) => Ok(s),
        _ => Err(mismatched(span)),
    }
}
