//! Operation registry for the celvm expression engine.
//!
//! Owns every function and operator overload and resolves a call by the
//! exact value kinds of its actual arguments. There is no implicit
//! conversion: `1 + 1u` has no overload unless one is registered.
//!
//! Registration happens once through [`RegistryBuilder`]; the resulting
//! [`OperationRegistry`] is immutable and can be shared by any number of
//! compilers and virtual machines. Binary operators are additionally
//! flattened into a dense [`BinaryTable`] on first use.
//!
//! ```
//! use celvm_common::{BinaryOperator, Span, Value};
//! use celvm_registry::OperationRegistry;
//!
//! let registry = OperationRegistry::standard().unwrap();
//! let three = registry
//!     .binary(BinaryOperator::Add.index(), &Value::Int(1), &Value::Int(2), Span::default())
//!     .unwrap();
//! assert_eq!(three, Value::Int(3));
//! ```

pub mod descriptor;
pub mod error;
pub mod registry;
pub mod stdlib;
pub mod table;

pub use descriptor::{
    BinaryHandler, BinaryOperatorDescriptor, BinaryOperatorSet, Function, FunctionDescriptor,
    FunctionHandler, UnaryHandler, UnaryOperatorDescriptor, UnaryOperatorSet,
};
pub use error::RegistryError;
pub use registry::{FunctionOverload, OperationRegistry, RegistryBuilder};
pub use table::BinaryTable;
