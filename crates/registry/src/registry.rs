//! The operation registry: owns every function and operator overload
//! and resolves calls by exact value-kind signature.
//!
//! Built once through [`RegistryBuilder`], then read-only. The flattened
//! binary table is derived lazily on first use and memoized.

use std::collections::HashMap;
use std::sync::OnceLock;

use celvm_common::kind::signature_key;
use celvm_common::{
    BinaryOperator, EvalError, Span, UnaryOperator, Value, ValueKind, ALL_BINARY_OPERATORS,
};
use tracing::debug;

use crate::descriptor::{
    BinaryHandler, BinaryOperatorDescriptor, FunctionDescriptor, FunctionHandler, UnaryHandler,
    UnaryOperatorDescriptor,
};
use crate::error::RegistryError;
use crate::table::BinaryTable;

/// One registered function overload.
pub struct FunctionOverload {
    pub name: String,
    pub signature: Vec<ValueKind>,
    pub idempotent: bool,
    handler: FunctionHandler,
}

impl FunctionOverload {
    /// Invoke the handler.
    pub fn call(&self, args: &[Value], span: Span) -> Result<Value, EvalError> {
        (self.handler)(args, span)
    }

    /// Human-readable signature, e.g. `size(list)`.
    pub fn describe(&self) -> String {
        format!("{}({})", self.name, describe_kinds(&self.signature))
    }
}

type BinaryMap = HashMap<BinaryOperator, HashMap<ValueKind, HashMap<ValueKind, BinaryHandler>>>;
type UnaryMap = HashMap<UnaryOperator, HashMap<ValueKind, UnaryHandler>>;

/// Accumulates registrations and produces an immutable registry.
#[derive(Default)]
pub struct RegistryBuilder {
    functions: HashMap<String, HashMap<String, FunctionOverload>>,
    binary: BinaryMap,
    unary: UnaryMap,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every overload of a function.
    ///
    /// Fails without partial registration if the name is empty or any
    /// overload's `(name, signature)` is already present.
    pub fn register_function(
        &mut self,
        descriptor: &dyn FunctionDescriptor,
    ) -> Result<&mut Self, RegistryError> {
        let name = descriptor.name();
        if name.is_empty() {
            return Err(RegistryError::EmptyFunctionName);
        }

        let overloads = descriptor.overloads();
        let existing = self.functions.get(name);
        let mut fresh: HashMap<String, FunctionOverload> = HashMap::new();
        for (signature, handler) in overloads {
            let key = signature_key(&signature);
            let taken = existing.map(|set| set.contains_key(&key)).unwrap_or(false);
            if taken || fresh.contains_key(&key) {
                return Err(RegistryError::DuplicateOverload {
                    name: name.to_string(),
                    signature: describe_kinds(&signature),
                });
            }
            fresh.insert(
                key,
                FunctionOverload {
                    name: name.to_string(),
                    signature,
                    idempotent: descriptor.is_idempotent(),
                    handler,
                },
            );
        }

        self.functions.entry(name.to_string()).or_default().extend(fresh);
        Ok(self)
    }

    /// Register every overload of a binary operator.
    pub fn register_binary(
        &mut self,
        descriptor: &dyn BinaryOperatorDescriptor,
    ) -> Result<&mut Self, RegistryError> {
        let op = descriptor.operator();
        let overloads = descriptor.overloads();
        for (i, (lhs, rhs, _)) in overloads.iter().enumerate() {
            let taken = self
                .binary
                .get(&op)
                .and_then(|by_lhs| by_lhs.get(lhs))
                .map(|by_rhs| by_rhs.contains_key(rhs))
                .unwrap_or(false);
            let repeated = overloads[..i].iter().any(|(l, r, _)| l == lhs && r == rhs);
            if taken || repeated {
                return Err(RegistryError::DuplicateBinaryOverload {
                    op,
                    lhs: *lhs,
                    rhs: *rhs,
                });
            }
        }

        let by_lhs = self.binary.entry(op).or_default();
        for (lhs, rhs, handler) in overloads {
            by_lhs.entry(lhs).or_default().insert(rhs, handler);
        }
        Ok(self)
    }

    /// Register every overload of a unary operator.
    pub fn register_unary(
        &mut self,
        descriptor: &dyn UnaryOperatorDescriptor,
    ) -> Result<&mut Self, RegistryError> {
        let op = descriptor.operator();
        let overloads = descriptor.overloads();
        for (i, (operand, _)) in overloads.iter().enumerate() {
            let taken = self
                .unary
                .get(&op)
                .map(|by_kind| by_kind.contains_key(operand))
                .unwrap_or(false);
            let repeated = overloads[..i].iter().any(|(k, _)| k == operand);
            if taken || repeated {
                return Err(RegistryError::DuplicateUnaryOverload {
                    op,
                    operand: *operand,
                });
            }
        }

        let by_kind = self.unary.entry(op).or_default();
        for (operand, handler) in overloads {
            by_kind.insert(operand, handler);
        }
        Ok(self)
    }

    /// Freeze the registrations.
    pub fn build(self) -> OperationRegistry {
        debug!(
            functions = self.functions.len(),
            binary_operators = self.binary.len(),
            unary_operators = self.unary.len(),
            "operation registry built"
        );
        OperationRegistry {
            functions: self.functions,
            binary: self.binary,
            unary: self.unary,
            flat: OnceLock::new(),
        }
    }
}

/// Immutable set of function and operator overloads.
///
/// Safe to share between threads and across any number of compiles and
/// executions.
pub struct OperationRegistry {
    functions: HashMap<String, HashMap<String, FunctionOverload>>,
    binary: BinaryMap,
    unary: UnaryMap,
    flat: OnceLock<BinaryTable>,
}

impl OperationRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// A registry holding the standard operators and functions.
    pub fn standard() -> Result<Self, RegistryError> {
        let mut builder = RegistryBuilder::new();
        crate::stdlib::register_standard(&mut builder)?;
        Ok(builder.build())
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Human-readable signatures registered under `name`, sorted.
    pub fn signatures(&self, name: &str) -> Vec<String> {
        let mut sigs: Vec<String> = self
            .functions
            .get(name)
            .map(|set| set.values().map(FunctionOverload::describe).collect())
            .unwrap_or_default();
        sigs.sort();
        sigs
    }

    /// Resolve a function overload by the exact kinds of the actual
    /// arguments.
    pub fn resolve_function(
        &self,
        name: &str,
        kinds: &[ValueKind],
        span: Span,
    ) -> Result<&FunctionOverload, EvalError> {
        let set = self
            .functions
            .get(name)
            .ok_or_else(|| EvalError::NoSuchFunction {
                span,
                name: name.to_string(),
            })?;
        set.get(&signature_key(kinds))
            .ok_or_else(|| EvalError::NoSuchOverload {
                span,
                name: name.to_string(),
                args: describe_kinds(kinds),
                available: self.signatures(name),
            })
    }

    /// Resolve and invoke a function. Returns the result and the
    /// callee's idempotence.
    pub fn call_function(
        &self,
        name: &str,
        args: &[Value],
        span: Span,
    ) -> Result<(Value, bool), EvalError> {
        let kinds: Vec<ValueKind> = args.iter().map(Value::kind).collect();
        let overload = self.resolve_function(name, &kinds, span)?;
        let value = overload.call(args, span)?;
        Ok((value, overload.idempotent))
    }

    /// The flattened binary lookup table, built on first access.
    pub fn binary_table(&self) -> &BinaryTable {
        self.flat.get_or_init(|| {
            let mut table = BinaryTable::new();
            for op in ALL_BINARY_OPERATORS {
                let Some(by_lhs) = self.binary.get(&op) else {
                    continue;
                };
                for (lhs, by_rhs) in by_lhs {
                    for (rhs, handler) in by_rhs {
                        table.insert(op.index(), *lhs, *rhs, handler.clone());
                    }
                }
            }
            debug!(entries = table.len(), "flattened binary table materialized");
            table
        })
    }

    /// Apply the binary operator with compact index `op_index`.
    pub fn binary(
        &self,
        op_index: usize,
        lhs: &Value,
        rhs: &Value,
        span: Span,
    ) -> Result<Value, EvalError> {
        let (lk, rk) = (lhs.kind(), rhs.kind());
        match self.binary_table().get(op_index, lk, rk) {
            Some(handler) => handler(lhs, rhs, span),
            None => Err(self.binary_miss(op_index, lk, rk, span)),
        }
    }

    fn binary_miss(&self, op_index: usize, lhs: ValueKind, rhs: ValueKind, span: Span) -> EvalError {
        let Some(op) = BinaryOperator::from_index(op_index) else {
            return EvalError::internal(span, format!("invalid binary operator index {op_index}"));
        };
        let mut available: Vec<String> = self
            .binary
            .get(&op)
            .map(|by_lhs| {
                by_lhs
                    .iter()
                    .flat_map(|(l, by_rhs)| by_rhs.keys().map(move |r| format!("{l} {op} {r}")))
                    .collect()
            })
            .unwrap_or_default();
        available.sort();
        EvalError::NoSuchOverload {
            span,
            name: op.symbol().to_string(),
            args: format!("{lhs}, {rhs}"),
            available,
        }
    }

    /// Apply a unary operator.
    pub fn unary(&self, op: UnaryOperator, operand: &Value, span: Span) -> Result<Value, EvalError> {
        let kind = operand.kind();
        let by_kind = self.unary.get(&op);
        match by_kind.and_then(|m| m.get(&kind)) {
            Some(handler) => handler(operand, span),
            None => {
                let mut available: Vec<String> = by_kind
                    .map(|m| m.keys().map(|k| format!("{op}{k}")).collect())
                    .unwrap_or_default();
                available.sort();
                Err(EvalError::NoSuchOverload {
                    span,
                    name: op.symbol().to_string(),
                    args: kind.to_string(),
                    available,
                })
            }
        }
    }
}

fn describe_kinds(kinds: &[ValueKind]) -> String {
    kinds
        .iter()
        .map(|k| k.name())
        .collect::<Vec<_>>()
        .join(", ")
}
