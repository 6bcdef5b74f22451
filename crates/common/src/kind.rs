//! Value kinds: the runtime discriminant used as the dispatch key for
//! every operator and function overload.

use std::fmt;

/// Identifies the kind of a runtime [`Value`](crate::Value).
///
/// The discriminants are dense (`0..KIND_COUNT`) so a kind can index
/// directly into flat lookup tables.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    /// The `null` value.
    Null = 0,
    /// Boolean.
    Bool = 1,
    /// Signed 64-bit integer.
    Int = 2,
    /// Unsigned 64-bit integer.
    UInt = 3,
    /// IEEE 754 64-bit float.
    Double = 4,
    /// UTF-8 string.
    String = 5,
    /// Byte sequence.
    Bytes = 6,
    /// Ordered list of values.
    List = 7,
    /// Insertion-ordered map with int, uint or string keys.
    Map = 8,
    /// Host-constructed message object.
    Message = 9,
}

/// Number of distinct value kinds.
pub const KIND_COUNT: usize = 10;

/// All value kinds, in discriminant order.
pub const ALL_KINDS: [ValueKind; KIND_COUNT] = [
    ValueKind::Null,
    ValueKind::Bool,
    ValueKind::Int,
    ValueKind::UInt,
    ValueKind::Double,
    ValueKind::String,
    ValueKind::Bytes,
    ValueKind::List,
    ValueKind::Map,
    ValueKind::Message,
];

impl ValueKind {
    /// Dense index of this kind, `0..KIND_COUNT`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the language-level name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::UInt => "uint",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Message => "message",
        }
    }

    /// Returns true for int, uint and double.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::UInt | ValueKind::Double)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Join kinds into the signature key used for overload lookup.
///
/// Order and arity matter: `(int, string)` and `(string, int)` produce
/// different keys, as do `(int)` and `(int, int)`.
pub fn signature_key(kinds: &[ValueKind]) -> String {
    kinds
        .iter()
        .map(|k| k.name())
        .collect::<Vec<_>>()
        .join(",")
}
