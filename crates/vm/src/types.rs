//! Message type resolution for `MAKE_MSG`.
//!
//! The VM never constructs arbitrary types: every message type must be
//! resolved through a [`TypeProvider`]. [`TypeRegistry`] is an allow-list
//! with declared field names, case-insensitive aliases, and an
//! aliases-enforced mode in which an aliased type can no longer be named
//! by its canonical name.

use std::collections::{HashMap, HashSet};

use celvm_common::{EvalError, MessageValue, Span, Value};

/// Resolves and constructs message types.
pub trait TypeProvider {
    /// Build a message of `type_name` from fields in source order.
    ///
    /// Fails `NoSuchType` if the name does not resolve to an allowed
    /// type and `MessageConstruction` if the fields are rejected.
    fn construct(
        &self,
        type_name: &str,
        fields: Vec<(String, Value)>,
        span: Span,
    ) -> Result<Value, EvalError>;
}

/// An allowed message type and its declared fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageType {
    pub name: String,
    pub fields: Vec<String>,
}

impl MessageType {
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

/// Allow-list of constructible message types.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, MessageType>,
    // lowercased alias -> canonical name
    aliases: HashMap<String, String>,
    aliased: HashSet<String>,
    aliases_enforced: bool,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `name` with the given declared fields.
    pub fn allow(mut self, name: &str, fields: &[&str]) -> Self {
        self.types.insert(
            name.to_string(),
            MessageType {
                name: name.to_string(),
                fields: fields.iter().map(|f| f.to_string()).collect(),
            },
        );
        self
    }

    /// Make `alias` (matched case-insensitively) resolve to `canonical`.
    pub fn alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases
            .insert(alias.to_lowercase(), canonical.to_string());
        self.aliased.insert(canonical.to_string());
        self
    }

    /// When enforced, aliased types resolve only through an alias.
    pub fn enforce_aliases(mut self, enforced: bool) -> Self {
        self.aliases_enforced = enforced;
        self
    }

    /// Resolve a type name as written in an expression.
    pub fn resolve(&self, name: &str) -> Option<&MessageType> {
        if let Some(canonical) = self.aliases.get(&name.to_lowercase()) {
            return self.types.get(canonical);
        }
        if self.aliases_enforced && self.aliased.contains(name) {
            return None;
        }
        self.types.get(name)
    }
}

impl TypeProvider for TypeRegistry {
    fn construct(
        &self,
        type_name: &str,
        fields: Vec<(String, Value)>,
        span: Span,
    ) -> Result<Value, EvalError> {
        let ty = self.resolve(type_name).ok_or_else(|| EvalError::NoSuchType {
            span,
            type_name: type_name.to_string(),
        })?;

        let mut message = MessageValue::new(ty.name.clone());
        for (field, value) in fields {
            if !ty.has_field(&field) {
                return Err(EvalError::MessageConstruction {
                    span,
                    type_name: ty.name.clone(),
                    reason: format!("no field named '{field}'"),
                });
            }
            if message.has(&field) {
                return Err(EvalError::MessageConstruction {
                    span,
                    type_name: ty.name.clone(),
                    reason: format!("field '{field}' set more than once"),
                });
            }
            message.fields.insert(field, value);
        }
        Ok(Value::Message(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .allow("acme.Point", &["x", "y"])
            .allow("acme.Empty", &[])
            .alias("Point", "acme.Point")
    }

    #[test]
    fn resolves_canonical_and_alias() {
        let r = registry();
        assert!(r.resolve("acme.Point").is_some());
        assert_eq!(r.resolve("POINT").map(|t| t.name.as_str()), Some("acme.Point"));
        assert!(r.resolve("acme.Missing").is_none());
    }

    #[test]
    fn enforced_aliases_hide_canonical_name() {
        let r = registry().enforce_aliases(true);
        assert!(r.resolve("acme.Point").is_none());
        assert!(r.resolve("point").is_some());
        // types without an alias are unaffected
        assert!(r.resolve("acme.Empty").is_some());
    }

    #[test]
    fn constructs_with_canonical_name() {
        let v = registry()
            .construct("point", vec![("x".into(), Value::Int(1))], Span::default())
            .unwrap();
        assert_eq!(
            v,
            Value::Message(MessageValue::new("acme.Point").with_field("x", Value::Int(1)))
        );
    }

    #[test]
    fn unknown_type_is_no_such_type() {
        let err = registry()
            .construct("acme.Nope", vec![], Span::new(1, 3))
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::NoSuchType {
                span: Span::new(1, 3),
                type_name: "acme.Nope".into()
            }
        );
    }

    #[test]
    fn undeclared_field_fails_construction() {
        let err = registry()
            .construct("acme.Point", vec![("z".into(), Value::Int(1))], Span::default())
            .unwrap_err();
        assert!(matches!(err, EvalError::MessageConstruction { .. }));
    }

    #[test]
    fn repeated_field_fails_construction() {
        let err = registry()
            .construct(
                "acme.Point",
                vec![("x".into(), Value::Int(1)), ("x".into(), Value::Int(2))],
                Span::default(),
            )
            .unwrap_err();
        assert!(matches!(err, EvalError::MessageConstruction { .. }));
    }
}
