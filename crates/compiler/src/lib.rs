//! Bytecode compiler for the celvm expression engine.
//!
//! Lowers an [`Expr`](celvm_common::Expr) tree to a flat register-machine
//! [`Program`](celvm_common::Program). Every intermediate result gets a
//! fresh register; short-circuit operators and conditionals use forward
//! jumps patched in place; the comprehension macros are lowered to
//! explicit iterator loops.
//!
//! No type checking happens here. Every type error surfaces at run time.
//!
//! # Usage
//!
//! ```
//! use celvm_common::expr::build::{binary, int};
//! use celvm_common::{BinaryOperator, Opcode};
//! use celvm_compiler::{compile, CompilerOptions};
//!
//! let program = compile(
//!     &binary(BinaryOperator::Add, int(1), int(2)),
//!     &CompilerOptions::default(),
//! )
//! .unwrap();
//! let last = program.fetch((program.len() - 1) * celvm_common::STRIDE).unwrap();
//! assert_eq!(last.opcode, Opcode::Return);
//! ```

mod codegen;
pub mod compiler;
pub mod error;
mod macros;
pub mod options;

pub use compiler::{compile, Compiler};
pub use error::CompileError;
pub use options::CompilerOptions;
