//! Descriptor traits implemented by library and extension code, plus
//! ready-made builder types implementing them.
//!
//! A descriptor names what it implements and enumerates its overloads.
//! The registry consumes descriptors once at build time.

use std::sync::Arc;

use celvm_common::{BinaryOperator, EvalError, Span, UnaryOperator, Value, ValueKind};

/// Handler for a function overload. Receives the evaluated arguments
/// (method receiver first) and the call span.
pub type FunctionHandler = Arc<dyn Fn(&[Value], Span) -> Result<Value, EvalError> + Send + Sync>;

/// Handler for a binary operator overload.
pub type BinaryHandler = Arc<dyn Fn(&Value, &Value, Span) -> Result<Value, EvalError> + Send + Sync>;

/// Handler for a unary operator overload.
pub type UnaryHandler = Arc<dyn Fn(&Value, Span) -> Result<Value, EvalError> + Send + Sync>;

/// A named function with one or more overloads.
pub trait FunctionDescriptor {
    /// Function name as written in expressions. Must be non-empty.
    fn name(&self) -> &str;

    /// Whether calling this function with the same arguments always
    /// yields the same result.
    fn is_idempotent(&self) -> bool {
        true
    }

    /// `(parameter kinds, handler)` pairs.
    fn overloads(&self) -> Vec<(Vec<ValueKind>, FunctionHandler)>;
}

/// Implementations of one binary operator.
pub trait BinaryOperatorDescriptor {
    fn operator(&self) -> BinaryOperator;

    /// `(lhs kind, rhs kind, handler)` triples.
    fn overloads(&self) -> Vec<(ValueKind, ValueKind, BinaryHandler)>;
}

/// Implementations of one unary operator.
pub trait UnaryOperatorDescriptor {
    fn operator(&self) -> UnaryOperator;

    /// `(operand kind, handler)` pairs.
    fn overloads(&self) -> Vec<(ValueKind, UnaryHandler)>;
}

/// A function descriptor assembled from closures.
///
/// ```
/// use celvm_common::{Value, ValueKind};
/// use celvm_registry::{Function, FunctionDescriptor};
///
/// let double_it = Function::new("double_it")
///     .overload(&[ValueKind::Int], |args, _| match &args[0] {
///         Value::Int(i) => Ok(Value::Int(i * 2)),
///         _ => unreachable!(),
///     });
/// assert_eq!(double_it.name(), "double_it");
/// ```
#[derive(Clone)]
pub struct Function {
    name: String,
    idempotent: bool,
    overloads: Vec<(Vec<ValueKind>, FunctionHandler)>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            idempotent: true,
            overloads: Vec::new(),
        }
    }

    /// Mark the function as non-idempotent (e.g. clock or random source).
    pub fn non_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }

    /// Add an overload for the exact parameter kinds `signature`.
    pub fn overload<F>(mut self, signature: &[ValueKind], handler: F) -> Self
    where
        F: Fn(&[Value], Span) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.overloads.push((signature.to_vec(), Arc::new(handler)));
        self
    }
}

impl FunctionDescriptor for Function {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    fn overloads(&self) -> Vec<(Vec<ValueKind>, FunctionHandler)> {
        self.overloads.clone()
    }
}

/// A binary operator descriptor assembled from closures.
#[derive(Clone)]
pub struct BinaryOperatorSet {
    op: BinaryOperator,
    overloads: Vec<(ValueKind, ValueKind, BinaryHandler)>,
}

impl BinaryOperatorSet {
    pub fn new(op: BinaryOperator) -> Self {
        Self {
            op,
            overloads: Vec::new(),
        }
    }

    pub fn overload<F>(mut self, lhs: ValueKind, rhs: ValueKind, handler: F) -> Self
    where
        F: Fn(&Value, &Value, Span) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.overloads.push((lhs, rhs, Arc::new(handler)));
        self
    }

    /// Register one shared handler for several kind pairs.
    pub fn overload_many(mut self, pairs: &[(ValueKind, ValueKind)], handler: BinaryHandler) -> Self {
        for &(lhs, rhs) in pairs {
            self.overloads.push((lhs, rhs, handler.clone()));
        }
        self
    }
}

impl BinaryOperatorDescriptor for BinaryOperatorSet {
    fn operator(&self) -> BinaryOperator {
        self.op
    }

    fn overloads(&self) -> Vec<(ValueKind, ValueKind, BinaryHandler)> {
        self.overloads.clone()
    }
}

/// A unary operator descriptor assembled from closures.
#[derive(Clone)]
pub struct UnaryOperatorSet {
    op: UnaryOperator,
    overloads: Vec<(ValueKind, UnaryHandler)>,
}

impl UnaryOperatorSet {
    pub fn new(op: UnaryOperator) -> Self {
        Self {
            op,
            overloads: Vec::new(),
        }
    }

    pub fn overload<F>(mut self, operand: ValueKind, handler: F) -> Self
    where
        F: Fn(&Value, Span) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.overloads.push((operand, Arc::new(handler)));
        self
    }
}

impl UnaryOperatorDescriptor for UnaryOperatorSet {
    fn operator(&self) -> UnaryOperator {
        self.op
    }

    fn overloads(&self) -> Vec<(ValueKind, UnaryHandler)> {
        self.overloads.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_defaults_to_idempotent() {
        let f = Function::new("f").overload(&[], |_, _| Ok(Value::Null));
        assert!(f.is_idempotent());
        assert!(!f.clone().non_idempotent().is_idempotent());
        assert_eq!(f.overloads().len(), 1);
    }

    #[test]
    fn overload_many_shares_handler() {
        let handler: BinaryHandler = Arc::new(|_: &Value, _: &Value, _: Span| Ok(Value::Bool(true)));
        let set = BinaryOperatorSet::new(BinaryOperator::Equals).overload_many(
            &[
                (ValueKind::Int, ValueKind::Int),
                (ValueKind::Int, ValueKind::UInt),
            ],
            handler,
        );
        let overloads = set.overloads();
        assert_eq!(overloads.len(), 2);
        assert_eq!(overloads[1].1, ValueKind::UInt);
    }
}
