//! Register virtual machine for the celvm expression engine.
//!
//! Executes a compiled [`Program`] against a variable [`Environment`],
//! dispatching every operator and function call through an
//! [`OperationRegistry`]. The machine holds:
//! - A register file sized by the program
//! - Iterator and list-accumulator side tables for comprehension loops
//! - A running idempotence flag for the current execution
//!
//! # Usage
//!
//! ```
//! use celvm_common::expr::build::{binary, ident, int};
//! use celvm_common::{BinaryOperator, Value};
//! use celvm_compiler::{compile, CompilerOptions};
//! use celvm_registry::OperationRegistry;
//! use celvm_vm::{run, Activation};
//!
//! let registry = OperationRegistry::standard().unwrap();
//! let program = compile(
//!     &binary(BinaryOperator::Multiply, ident("x"), int(6)),
//!     &CompilerOptions::default(),
//! )
//! .unwrap();
//!
//! let mut env = Activation::new().with_variable("x", Value::Int(7));
//! assert_eq!(run(&program, &registry, &mut env).unwrap(), Value::Int(42));
//! ```

pub mod environment;
pub mod execute;
pub mod machine;
pub mod types;

pub use environment::{Activation, Environment};
pub use machine::VirtualMachine;
pub use types::{MessageType, TypeProvider, TypeRegistry};

use celvm_common::{EvalError, Program, Value};
use celvm_registry::OperationRegistry;

/// Execute a program once on a fresh machine and return its result.
///
/// Hosts that evaluate many programs, or need the idempotence flag,
/// should keep a [`VirtualMachine`] instead.
///
/// # Errors
///
/// Returns [`EvalError`] for any failure during evaluation (unknown
/// variable, missing overload, overflow, division by zero, etc.).
pub fn run(
    program: &Program,
    registry: &OperationRegistry,
    env: &mut dyn Environment,
) -> Result<Value, EvalError> {
    VirtualMachine::new(registry).execute(program, env)
}
