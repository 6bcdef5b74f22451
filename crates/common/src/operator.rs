//! Operator enumerations shared by the expression tree, the compiler,
//! and the operation registry.
//!
//! The binary operator discriminants are the compact operator index
//! carried by `BINARY_OP` instructions and used by the registry's
//! flattened lookup table.

use std::fmt;

/// Binary operators, in their fixed bytecode order.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryOperator {
    Less = 0,
    LessEquals = 1,
    Greater = 2,
    GreaterEquals = 3,
    Equals = 4,
    NotEquals = 5,
    In = 6,
    Add = 7,
    Subtract = 8,
    Multiply = 9,
    Divide = 10,
    Modulo = 11,
    LogicalAnd = 12,
    LogicalOr = 13,
}

/// Number of binary operators.
pub const BINARY_OPERATOR_COUNT: usize = 14;

/// All binary operators, indexed by their bytecode operator index.
pub const ALL_BINARY_OPERATORS: [BinaryOperator; BINARY_OPERATOR_COUNT] = [
    BinaryOperator::Less,
    BinaryOperator::LessEquals,
    BinaryOperator::Greater,
    BinaryOperator::GreaterEquals,
    BinaryOperator::Equals,
    BinaryOperator::NotEquals,
    BinaryOperator::In,
    BinaryOperator::Add,
    BinaryOperator::Subtract,
    BinaryOperator::Multiply,
    BinaryOperator::Divide,
    BinaryOperator::Modulo,
    BinaryOperator::LogicalAnd,
    BinaryOperator::LogicalOr,
];

impl BinaryOperator {
    /// The compact operator index, `0..BINARY_OPERATOR_COUNT`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up an operator by its compact index.
    pub fn from_index(index: usize) -> Option<BinaryOperator> {
        ALL_BINARY_OPERATORS.get(index).copied()
    }

    /// Source-level symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Less => "<",
            BinaryOperator::LessEquals => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEquals => ">=",
            BinaryOperator::Equals => "==",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::In => "in",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::LogicalAnd => "&&",
            BinaryOperator::LogicalOr => "||",
        }
    }

    /// True for `&&` and `||`, which compile to short-circuit code.
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Arithmetic negation, `-x`.
    Negate,
    /// Logical negation, `!x`.
    Not,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "!",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
