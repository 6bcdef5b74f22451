//! Compile-time errors.

use celvm_common::Span;
use thiserror::Error;

/// Errors that abort a compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Expression node kind with no lowering.
    #[error("{span}: unsupported expression node '{node}'")]
    UnsupportedOperation { span: Span, node: String },

    /// A register, pool, or jump offset no longer fits a 32-bit operand.
    #[error("{span}: program too large: {what} exceeds u32 range")]
    ProgramTooLarge { span: Span, what: &'static str },
}

impl CompileError {
    pub fn span(&self) -> Span {
        match self {
            CompileError::UnsupportedOperation { span, .. }
            | CompileError::ProgramTooLarge { span, .. } => *span,
        }
    }
}
