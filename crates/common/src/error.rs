//! Error types shared by the registry, compiler output, and VM.

use thiserror::Error;

use crate::kind::ValueKind;
use crate::span::Span;

/// Errors that occur while decoding an instruction record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Opcode 0 is illegal and always rejected.
    #[error("illegal opcode 0x00")]
    IllegalOpcode,

    /// Opcode word not assigned to any operation.
    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u32),

    /// Fewer than six words remain at the decode offset.
    #[error("truncated instruction at offset {offset}")]
    Truncated { offset: usize },

    /// Decode offset is not a multiple of the record stride.
    #[error("misaligned instruction offset {offset}")]
    Misaligned { offset: usize },
}

/// Which construct a failing boolean check belonged to.
///
/// Encoded in the `op2` slot of `COND_CHECK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionRole {
    /// `cond ? a : b`
    Conditional = 0,
    /// The predicate of `all`, `exists`, `exists_one`.
    Predicate = 1,
    /// The predicate of `filter` or the filter argument of `map`.
    Filter = 2,
}

impl ConditionRole {
    pub fn from_tag(tag: u32) -> Option<ConditionRole> {
        match tag {
            0 => Some(ConditionRole::Conditional),
            1 => Some(ConditionRole::Predicate),
            2 => Some(ConditionRole::Filter),
            _ => None,
        }
    }

    pub fn tag(self) -> u32 {
        self as u32
    }
}

/// Evaluation errors. Every variant carries the span of the construct
/// that triggered it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{span}: no such variable '{name}'")]
    NoSuchVariable { span: Span, name: String },

    #[error("{span}: no such function '{name}'")]
    NoSuchFunction { span: Span, name: String },

    /// Name (or operator) known, but no overload accepts these kinds.
    #[error("{span}: no matching overload for '{name}({args})'; available: [{}]", .available.join("; "))]
    NoSuchOverload {
        span: Span,
        name: String,
        args: String,
        available: Vec<String>,
    },

    /// Missing map/message key, or out-of-bounds list index.
    #[error("{span}: no such key: {key}")]
    NoSuchKey { span: Span, key: String },

    #[error("{span}: unknown or disallowed type '{type_name}'")]
    NoSuchType { span: Span, type_name: String },

    #[error("{span}: condition must be bool, found {found}")]
    InvalidConditionType { span: Span, found: ValueKind },

    #[error("{span}: map keys must be int, uint or string, found {found}")]
    UnexpectedMapKeyType { span: Span, found: ValueKind },

    #[error("{span}: cannot index {operand} with {index}")]
    InvalidIndexType {
        span: Span,
        operand: ValueKind,
        index: ValueKind,
    },

    #[error("{span}: cannot select field '{field}' from {operand}")]
    InvalidMemberAccess {
        span: Span,
        operand: ValueKind,
        field: String,
    },

    #[error("{span}: division by zero")]
    DivisionByZero { span: Span },

    #[error("{span}: modulus by zero")]
    ModulusByZero { span: Span },

    #[error("{span}: {operation} overflow")]
    Overflow { span: Span, operation: String },

    #[error("{span}: failed to construct '{type_name}': {reason}")]
    MessageConstruction {
        span: Span,
        type_name: String,
        reason: String,
    },

    /// A library function rejected an argument value of an accepted kind.
    #[error("{span}: invalid argument: {reason}")]
    InvalidArgument { span: Span, reason: String },

    #[error("{span}: invalid macro call: {reason}")]
    InvalidMacroCall { span: Span, reason: String },

    /// Engine failure: malformed program or broken VM invariant. Never
    /// produced by a well-formed program.
    #[error("{span}: internal error: {reason}")]
    Internal { span: Span, reason: String },
}

impl EvalError {
    /// The source span this error is attributed to.
    pub fn span(&self) -> Span {
        match self {
            EvalError::NoSuchVariable { span, .. }
            | EvalError::NoSuchFunction { span, .. }
            | EvalError::NoSuchOverload { span, .. }
            | EvalError::NoSuchKey { span, .. }
            | EvalError::NoSuchType { span, .. }
            | EvalError::InvalidConditionType { span, .. }
            | EvalError::UnexpectedMapKeyType { span, .. }
            | EvalError::InvalidIndexType { span, .. }
            | EvalError::InvalidMemberAccess { span, .. }
            | EvalError::DivisionByZero { span }
            | EvalError::ModulusByZero { span }
            | EvalError::Overflow { span, .. }
            | EvalError::MessageConstruction { span, .. }
            | EvalError::InvalidArgument { span, .. }
            | EvalError::InvalidMacroCall { span, .. }
            | EvalError::Internal { span, .. } => *span,
        }
    }

    /// Shorthand for an overflow error.
    pub fn overflow(span: Span, operation: impl Into<String>) -> Self {
        EvalError::Overflow {
            span,
            operation: operation.into(),
        }
    }

    /// Shorthand for an internal engine error.
    pub fn internal(span: Span, reason: impl Into<String>) -> Self {
        EvalError::Internal {
            span,
            reason: reason.into(),
        }
    }
}
