//! Compiler configuration.

/// Options captured by a [`Compiler`](crate::Compiler) at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Lower `has`, `all`, `exists`, `exists_one`, `filter` and `map`
    /// calls of matching shape to inline loops. When off, they compile as
    /// ordinary function calls.
    pub macros: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self { macros: true }
    }
}

impl CompilerOptions {
    pub fn with_macros(mut self, enabled: bool) -> Self {
        self.macros = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_enabled_by_default() {
        assert!(CompilerOptions::default().macros);
        assert!(!CompilerOptions::default().with_macros(false).macros);
    }
}
