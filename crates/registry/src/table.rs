//! Flattened binary-operator lookup table.
//!
//! A dense `[operator index][lhs kind][rhs kind]` array derived from the
//! registry's nested maps, so the VM's dispatch loop resolves a binary
//! operator with one bounds-checked index computation.

use celvm_common::{ValueKind, BINARY_OPERATOR_COUNT, KIND_COUNT};

use crate::descriptor::BinaryHandler;

/// Dense binary dispatch table.
pub struct BinaryTable {
    slots: Vec<Option<BinaryHandler>>,
    populated: usize,
}

impl BinaryTable {
    /// An empty table with a slot for every operator/kind triple.
    pub(crate) fn new() -> Self {
        Self {
            slots: vec![None; BINARY_OPERATOR_COUNT * KIND_COUNT * KIND_COUNT],
            populated: 0,
        }
    }

    fn slot(op_index: usize, lhs: ValueKind, rhs: ValueKind) -> usize {
        (op_index * KIND_COUNT + lhs.index()) * KIND_COUNT + rhs.index()
    }

    pub(crate) fn insert(&mut self, op_index: usize, lhs: ValueKind, rhs: ValueKind, handler: BinaryHandler) {
        let slot = &mut self.slots[Self::slot(op_index, lhs, rhs)];
        if slot.is_none() {
            self.populated += 1;
        }
        *slot = Some(handler);
    }

    /// Handler for `lhs <op> rhs`, or `None` if no overload exists or
    /// the operator index is out of range.
    pub fn get(&self, op_index: usize, lhs: ValueKind, rhs: ValueKind) -> Option<&BinaryHandler> {
        if op_index >= BINARY_OPERATOR_COUNT {
            return None;
        }
        self.slots[Self::slot(op_index, lhs, rhs)].as_ref()
    }

    /// Number of populated entries.
    pub fn len(&self) -> usize {
        self.populated
    }

    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }
}
