//! Variable environment consumed by the VM.
//!
//! The VM only needs lookup, binding in the innermost scope, and strictly
//! nested scope push/pop. Hosts can implement [`Environment`] over their
//! own storage; [`Activation`] is a ready-made scope stack.

use std::collections::HashMap;

use celvm_common::Value;

/// Variable lookup and scoping used during execution.
pub trait Environment {
    /// Resolve `name`, innermost scope first.
    fn get_variable(&self, name: &str) -> Option<&Value>;

    /// Enter a child scope that shadows, but never modifies, its parent.
    fn push_scope(&mut self);

    /// Leave the innermost child scope, restoring exactly the scope that
    /// was active before the matching push.
    fn pop_scope(&mut self);

    /// Bind `name` in the innermost scope, replacing any binding there
    /// and shadowing outer ones.
    fn add_variable(&mut self, name: &str, value: Value);
}

/// A stack of variable scopes. The root scope is never popped.
#[derive(Debug, Clone)]
pub struct Activation {
    scopes: Vec<HashMap<String, Value>>,
}

impl Default for Activation {
    fn default() -> Self {
        Self::new()
    }
}

impl Activation {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    /// Builder-style root binding.
    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.scopes[0].insert(name.into(), value);
        self
    }

    /// Number of scopes including the root.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl Environment for Activation {
    fn get_variable(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn add_variable(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Activation {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let root = iter.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self { scopes: vec![root] }
    }
}
