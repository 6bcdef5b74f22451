//! Shared types for the celvm expression engine.
//!
//! This crate provides the foundational data structures used by the
//! compiler, the operation registry, and the virtual machine:
//!
//! - [`Value`] / [`ValueKind`]: the runtime value model and its dispatch key
//! - [`Expr`]: the expression tree consumed by the compiler
//! - [`BinaryOperator`] / [`UnaryOperator`]: operator enumerations
//! - [`Opcode`] / [`Instruction`]: the six-word instruction record
//! - [`Program`]: the immutable compiled program
//! - [`EvalError`]: the evaluation error taxonomy

pub mod error;
pub mod expr;
pub mod instruction;
pub mod kind;
pub mod listing;
pub mod opcode;
pub mod operator;
pub mod program;
pub mod span;
pub mod value;

// Re-export commonly used types at the crate root.
pub use error::{ConditionRole, DecodeError, EvalError};
pub use expr::{Expr, ExprKind, Literal};
pub use instruction::{Instruction, STRIDE};
pub use kind::{ValueKind, ALL_KINDS, KIND_COUNT};
pub use opcode::{Opcode, Operand};
pub use operator::{BinaryOperator, UnaryOperator, ALL_BINARY_OPERATORS, BINARY_OPERATOR_COUNT};
pub use program::Program;
pub use span::Span;
pub use value::{map_get, MapKey, MessageValue, Value, ValueMap};
