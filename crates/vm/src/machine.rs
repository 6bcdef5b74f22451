//! VM state: register file, iterator and accumulator side tables, and
//! the running idempotence flag.
//!
//! All of it is per-execution and is reset at the start of every call.

use std::collections::HashMap;

use celvm_common::{EvalError, Program, Span, Value};
use celvm_registry::OperationRegistry;

use crate::types::TypeProvider;

/// Remaining items of one comprehension loop.
#[derive(Debug, Clone)]
pub(crate) struct IterState {
    items: std::vec::IntoIter<Value>,
}

impl IterState {
    pub(crate) fn new(items: Vec<Value>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }

    pub(crate) fn next_item(&mut self) -> Option<Value> {
        self.items.next()
    }
}

/// The celvm register machine.
///
/// Borrows an immutable [`OperationRegistry`] (and optionally a
/// [`TypeProvider`]) and can execute any number of programs in sequence.
/// Nothing carries over from one execution to the next.
pub struct VirtualMachine<'r> {
    pub(crate) registry: &'r OperationRegistry,
    pub(crate) types: Option<&'r dyn TypeProvider>,
    /// `None` until first written.
    pub(crate) registers: Vec<Option<Value>>,
    /// Keyed by the iterator register named in `ITER_INIT`.
    pub(crate) iterators: HashMap<u32, IterState>,
    /// Lists under construction by `LIST_APPEND`, keyed by register.
    pub(crate) accumulators: HashMap<u32, Vec<Value>>,
    pub(crate) idempotent: bool,
    /// Scopes pushed by the current execution and not yet popped.
    pub(crate) open_scopes: usize,
}

impl<'r> VirtualMachine<'r> {
    pub fn new(registry: &'r OperationRegistry) -> Self {
        Self {
            registry,
            types: None,
            registers: Vec::new(),
            iterators: HashMap::new(),
            accumulators: HashMap::new(),
            idempotent: true,
            open_scopes: 0,
        }
    }

    /// Resolve message types through `types`. Without a provider every
    /// message construction fails `NoSuchType`.
    pub fn with_types(mut self, types: &'r dyn TypeProvider) -> Self {
        self.types = Some(types);
        self
    }

    /// Whether the last execution called only idempotent functions.
    pub fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    pub(crate) fn reset(&mut self, program: &Program) {
        self.registers.clear();
        self.registers
            .resize(program.register_count as usize, None);
        self.iterators.clear();
        self.accumulators.clear();
        self.idempotent = true;
        self.open_scopes = 0;
    }

    pub(crate) fn read(&self, reg: u32, span: Span) -> Result<&Value, EvalError> {
        self.registers
            .get(reg as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| EvalError::internal(span, format!("register r{reg} read before write")))
    }

    /// Read a run of `count` registers starting at `base`.
    pub(crate) fn read_run(&self, base: u32, count: u32, span: Span) -> Result<Vec<Value>, EvalError> {
        (0..count)
            .map(|i| {
                let reg = base
                    .checked_add(i)
                    .ok_or_else(|| EvalError::internal(span, "register run out of range"))?;
                self.read(reg, span).cloned()
            })
            .collect()
    }

    /// Overwrite a register. Any pending accumulator on it is discarded.
    pub(crate) fn write(&mut self, reg: u32, value: Value, span: Span) -> Result<(), EvalError> {
        self.accumulators.remove(&reg);
        let slot = self
            .registers
            .get_mut(reg as usize)
            .ok_or_else(|| EvalError::internal(span, format!("register r{reg} out of range")))?;
        *slot = Some(value);
        Ok(())
    }

    /// The register's value, turning a pending accumulator into a
    /// concrete list and clearing it.
    pub(crate) fn materialize(&mut self, reg: u32, span: Span) -> Result<Value, EvalError> {
        match self.accumulators.remove(&reg) {
            Some(items) => Ok(Value::List(items)),
            None => self.read(reg, span).cloned(),
        }
    }

    /// Append to the accumulator on `reg`, seeding it from the list the
    /// register currently holds.
    pub(crate) fn append(&mut self, reg: u32, value: Value, span: Span) -> Result<(), EvalError> {
        if let Some(items) = self.accumulators.get_mut(&reg) {
            items.push(value);
            return Ok(());
        }
        let mut items = match self.read(reg, span)? {
            Value::List(items) => items.clone(),
            other => {
                return Err(EvalError::internal(
                    span,
                    format!("LIST_APPEND target r{reg} holds {}", other.kind()),
                ))
            }
        };
        items.push(value);
        self.accumulators.insert(reg, items);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm_with_registers(n: u32) -> VirtualMachine<'static> {
        static REGISTRY: std::sync::OnceLock<OperationRegistry> = std::sync::OnceLock::new();
        let registry = REGISTRY.get_or_init(|| OperationRegistry::builder().build());
        let mut vm = VirtualMachine::new(registry);
        vm.reset(&Program {
            register_count: n,
            ..Program::default()
        });
        vm
    }

    #[test]
    fn unwritten_register_is_internal_error() {
        let vm = vm_with_registers(2);
        assert!(matches!(
            vm.read(1, Span::default()),
            Err(EvalError::Internal { .. })
        ));
        assert!(matches!(
            vm.read(7, Span::default()),
            Err(EvalError::Internal { .. })
        ));
    }

    #[test]
    fn accumulator_materializes_once() {
        let mut vm = vm_with_registers(2);
        let span = Span::default();
        vm.write(0, Value::List(vec![]), span).unwrap();
        vm.append(0, Value::Int(1), span).unwrap();
        vm.append(0, Value::Int(2), span).unwrap();
        assert_eq!(
            vm.materialize(0, span).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
        // cleared: the register's own value remains
        assert_eq!(vm.materialize(0, span).unwrap(), Value::List(vec![]));
    }

    #[test]
    fn write_discards_pending_accumulator() {
        let mut vm = vm_with_registers(1);
        let span = Span::default();
        vm.write(0, Value::List(vec![]), span).unwrap();
        vm.append(0, Value::Int(1), span).unwrap();
        vm.write(0, Value::List(vec![]), span).unwrap();
        vm.append(0, Value::Int(9), span).unwrap();
        assert_eq!(
            vm.materialize(0, span).unwrap(),
            Value::List(vec![Value::Int(9)])
        );
    }

    #[test]
    fn append_to_non_list_is_internal_error() {
        let mut vm = vm_with_registers(1);
        let span = Span::default();
        vm.write(0, Value::Int(0), span).unwrap();
        assert!(matches!(
            vm.append(0, Value::Int(1), span),
            Err(EvalError::Internal { .. })
        ));
    }

    #[test]
    fn reset_clears_state() {
        let mut vm = vm_with_registers(1);
        vm.write(0, Value::Int(5), Span::default()).unwrap();
        vm.idempotent = false;
        vm.reset(&Program {
            register_count: 1,
            ..Program::default()
        });
        assert!(vm.is_idempotent());
        assert!(vm.read(0, Span::default()).is_err());
    }
}
