//! Registration errors.

use celvm_common::{BinaryOperator, UnaryOperator, ValueKind};
use thiserror::Error;

/// Errors raised while building an operation registry.
///
/// Overload sets are append-only and must stay unambiguous, so any
/// second registration of an existing key is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("function name must not be empty")]
    EmptyFunctionName,

    #[error("duplicate overload {name}({signature})")]
    DuplicateOverload { name: String, signature: String },

    #[error("duplicate binary overload {lhs} {op} {rhs}")]
    DuplicateBinaryOverload {
        op: BinaryOperator,
        lhs: ValueKind,
        rhs: ValueKind,
    },

    #[error("duplicate unary overload {op}{operand}")]
    DuplicateUnaryOverload {
        op: UnaryOperator,
        operand: ValueKind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        assert_eq!(
            RegistryError::DuplicateOverload {
                name: "size".into(),
                signature: "list".into()
            }
            .to_string(),
            "duplicate overload size(list)"
        );
        assert_eq!(
            RegistryError::DuplicateBinaryOverload {
                op: BinaryOperator::Add,
                lhs: ValueKind::Int,
                rhs: ValueKind::Int
            }
            .to_string(),
            "duplicate binary overload int + int"
        );
        assert_eq!(
            RegistryError::DuplicateUnaryOverload {
                op: UnaryOperator::Negate,
                operand: ValueKind::Int
            }
            .to_string(),
            "duplicate unary overload -int"
        );
    }
}
