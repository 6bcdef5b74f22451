//! Runtime value representation.
//!
//! Values are what live in VM registers and in the variable environment.
//! The [`ValueKind`] of a value is the key for all overload dispatch.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;

use crate::kind::ValueKind;

/// Insertion-ordered map value.
pub type ValueMap = IndexMap<MapKey, Value>;

/// Runtime value representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The `null` value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer.
    UInt(u64),
    /// IEEE 754 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Byte sequence.
    Bytes(Vec<u8>),
    /// Ordered list.
    List(Vec<Value>),
    /// Insertion-ordered map. Last write wins for duplicate keys.
    Map(ValueMap),
    /// Host-constructed message object.
    Message(MessageValue),
}

/// Keys permitted in map values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    Int(i64),
    UInt(u64),
    String(String),
}

impl MapKey {
    /// Convert a value into a map key. Returns `None` for kinds that cannot
    /// be used as keys.
    pub fn from_value(value: &Value) -> Option<MapKey> {
        match value {
            Value::Int(i) => Some(MapKey::Int(*i)),
            Value::UInt(u) => Some(MapKey::UInt(*u)),
            Value::String(s) => Some(MapKey::String(s.clone())),
            _ => None,
        }
    }

    /// The key as a value, as yielded when iterating a map.
    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Int(i) => Value::Int(*i),
            MapKey::UInt(u) => Value::UInt(*u),
            MapKey::String(s) => Value::String(s.clone()),
        }
    }

    /// The same integer under the other integer kind, if representable.
    pub fn numeric_twin(&self) -> Option<MapKey> {
        match self {
            MapKey::Int(i) => u64::try_from(*i).ok().map(MapKey::UInt),
            MapKey::UInt(u) => i64::try_from(*u).ok().map(MapKey::Int),
            MapKey::String(_) => None,
        }
    }
}

/// Look up `key`, matching int and uint keys across kinds by value.
pub fn map_get<'m>(map: &'m ValueMap, key: &MapKey) -> Option<&'m Value> {
    map.get(key)
        .or_else(|| key.numeric_twin().and_then(|twin| map.get(&twin)))
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Int(i) => write!(f, "{i}"),
            MapKey::UInt(u) => write!(f, "{u}u"),
            MapKey::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// A message object: a type name plus ordered, named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageValue {
    /// Fully-qualified type name.
    pub type_name: String,
    /// Field values in declaration order.
    pub fields: IndexMap<String, Value>,
}

impl MessageValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field assignment.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

impl Value {
    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::UInt(_) => ValueKind::UInt,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Message(_) => ValueKind::Message,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Ordering between two values.
    ///
    /// Defined within bool, string and bytes, and across the numeric
    /// kinds (int, uint, double compare by mathematical value). Returns
    /// `None` for unordered pairs, including any comparison with NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::UInt(a), Value::UInt(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::UInt(b)) => Some(compare_int_uint(*a, *b)),
            (Value::UInt(a), Value::Int(b)) => Some(compare_int_uint(*b, *a).reverse()),
            (Value::Int(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
            (Value::Double(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::UInt(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
            (Value::Double(a), Value::UInt(b)) => a.partial_cmp(&(*b as f64)),
            _ => None,
        }
    }

    /// Language-level equality.
    ///
    /// Numeric values compare across kinds by value. Lists and maps
    /// compare element-wise with the same rule, and map int/uint keys
    /// match across kinds. Any other pair of different kinds is unequal.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| map_get(b, k).is_some_and(|w| v.equals(w)))
            }
            (a, b) if a.kind().is_numeric() && b.kind().is_numeric() => {
                a.compare(b) == Some(Ordering::Equal)
            }
            (a, b) => a == b,
        }
    }
}

fn compare_int_uint(a: i64, b: u64) -> Ordering {
    if a < 0 {
        Ordering::Less
    } else {
        (a as u64).cmp(&b)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}u"),
            Value::Double(d) => write!(f, "{d:?}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Message(msg) => {
                write!(f, "{}{{", msg.type_name)?;
                for (i, (k, v)) in msg.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}
