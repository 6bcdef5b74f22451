//! Opcode definitions for the register-based instruction set.
//!
//! Every instruction is one fixed-width record `(opcode, dst, op1, op2,
//! op3, span)`. The meaning of the four operand slots depends on the
//! opcode and is described by [`Opcode::layout`].

use crate::error::DecodeError;

/// Identifies the operation to perform.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Loads
    /// `regs[dst] = constants[op1]`
    LoadConst = 0x01,
    /// `regs[dst] = env[strings[op1]]`
    LoadVar = 0x02,
    /// `regs[dst] = true`
    LoadTrue = 0x03,
    /// `regs[dst] = false`
    LoadFalse = 0x04,
    /// `regs[dst] = null`
    LoadNull = 0x05,

    // Operators
    /// `regs[dst] = -regs[op1]` via the unary registry.
    Negate = 0x10,
    /// `regs[dst] = !regs[op1]` via the unary registry.
    Not = 0x11,
    /// `regs[dst] = regs[op1] <op2> regs[op3]` via the flattened binary table.
    BinaryOp = 0x12,

    // Control flow
    /// Jump to `op1` if `regs[dst]` is `false`. Non-booleans fall through.
    JumpIfFalse = 0x20,
    /// Jump to `op1` if `regs[dst]` is `true`. Non-booleans fall through.
    JumpIfTrue = 0x21,
    /// Jump to `op1`.
    Jump = 0x22,
    /// Fail unless `regs[op1]` is a boolean. `op2` is the role tag.
    CondCheck = 0x23,

    // Access
    /// `regs[dst] = regs[op1].strings[op2]`
    MemberAccess = 0x30,
    /// `regs[dst] = regs[op1][regs[op2]]`
    Index = 0x31,
    /// `regs[dst] = has(regs[op1].strings[op2])`
    HasField = 0x32,

    // Calls
    /// `regs[dst] = strings[op1](regs[op2 .. op2 + op3])`
    Call = 0x40,

    // Construction
    /// `regs[dst] = [regs[op1 .. op1 + op2]]`
    MakeList = 0x50,
    /// `regs[dst] = {k: v, ...}` from `op2` key/value pairs starting at `op1`.
    MakeMap = 0x51,
    /// `regs[dst] = strings[op3]{fields...}` with names `message_fields[op2]`
    /// and values starting at `op1`.
    MakeMsg = 0x52,

    // Comprehension loops
    /// `regs[dst] = iterator over regs[op1]`
    IterInit = 0x60,
    /// `regs[dst] = next(regs[op1])`, or jump to `op2` when exhausted.
    IterNext = 0x61,
    /// Push a child variable scope.
    ScopePush = 0x62,
    /// Pop the innermost variable scope.
    ScopePop = 0x63,
    /// Bind `strings[op1] = regs[op2]` in the innermost scope.
    BindVar = 0x64,
    /// Append `regs[op1]` to the pending list accumulator of `dst`.
    ListAppend = 0x65,
    /// `regs[dst] += 1`
    IntInc = 0x66,

    // Moves and termination
    /// `regs[dst] = regs[op1]`, materializing a pending accumulator.
    Move = 0x70,
    /// Stop execution and yield `regs[op1]`.
    Return = 0xFE,
}

/// All valid opcodes, in definition order.
pub const ALL_OPCODES: [Opcode; 28] = [
    Opcode::LoadConst,
    Opcode::LoadVar,
    Opcode::LoadTrue,
    Opcode::LoadFalse,
    Opcode::LoadNull,
    Opcode::Negate,
    Opcode::Not,
    Opcode::BinaryOp,
    Opcode::JumpIfFalse,
    Opcode::JumpIfTrue,
    Opcode::Jump,
    Opcode::CondCheck,
    Opcode::MemberAccess,
    Opcode::Index,
    Opcode::HasField,
    Opcode::Call,
    Opcode::MakeList,
    Opcode::MakeMap,
    Opcode::MakeMsg,
    Opcode::IterInit,
    Opcode::IterNext,
    Opcode::ScopePush,
    Opcode::ScopePop,
    Opcode::BindVar,
    Opcode::ListAppend,
    Opcode::IntInc,
    Opcode::Move,
    Opcode::Return,
];

/// What an operand slot of an instruction refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Slot is not used and is always zero.
    Unused,
    /// A register id.
    Register,
    /// Index into the constant pool.
    Constant,
    /// Index into the string pool.
    String,
    /// Instruction offset (multiple of the record stride).
    Target,
    /// Compact binary operator index.
    Operator,
    /// `COND_CHECK` role tag.
    Role,
    /// Element / argument / entry count.
    Count,
    /// Index into the message field-list table.
    MessageFields,
}

impl TryFrom<u32> for Opcode {
    type Error = DecodeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x00 => Err(DecodeError::IllegalOpcode),

            0x01 => Ok(Opcode::LoadConst),
            0x02 => Ok(Opcode::LoadVar),
            0x03 => Ok(Opcode::LoadTrue),
            0x04 => Ok(Opcode::LoadFalse),
            0x05 => Ok(Opcode::LoadNull),

            0x10 => Ok(Opcode::Negate),
            0x11 => Ok(Opcode::Not),
            0x12 => Ok(Opcode::BinaryOp),

            0x20 => Ok(Opcode::JumpIfFalse),
            0x21 => Ok(Opcode::JumpIfTrue),
            0x22 => Ok(Opcode::Jump),
            0x23 => Ok(Opcode::CondCheck),

            0x30 => Ok(Opcode::MemberAccess),
            0x31 => Ok(Opcode::Index),
            0x32 => Ok(Opcode::HasField),

            0x40 => Ok(Opcode::Call),

            0x50 => Ok(Opcode::MakeList),
            0x51 => Ok(Opcode::MakeMap),
            0x52 => Ok(Opcode::MakeMsg),

            0x60 => Ok(Opcode::IterInit),
            0x61 => Ok(Opcode::IterNext),
            0x62 => Ok(Opcode::ScopePush),
            0x63 => Ok(Opcode::ScopePop),
            0x64 => Ok(Opcode::BindVar),
            0x65 => Ok(Opcode::ListAppend),
            0x66 => Ok(Opcode::IntInc),

            0x70 => Ok(Opcode::Move),
            0xFE => Ok(Opcode::Return),

            _ => Err(DecodeError::InvalidOpcode(value)),
        }
    }
}

impl Opcode {
    /// Returns the listing mnemonic for this opcode.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::LoadConst => "LOAD_CONST",
            Opcode::LoadVar => "LOAD_VAR",
            Opcode::LoadTrue => "LOAD_TRUE",
            Opcode::LoadFalse => "LOAD_FALSE",
            Opcode::LoadNull => "LOAD_NULL",
            Opcode::Negate => "NEGATE",
            Opcode::Not => "NOT",
            Opcode::BinaryOp => "BINARY_OP",
            Opcode::JumpIfFalse => "JUMP_IF_FALSE",
            Opcode::JumpIfTrue => "JUMP_IF_TRUE",
            Opcode::Jump => "JUMP",
            Opcode::CondCheck => "COND_CHECK",
            Opcode::MemberAccess => "MEMBER_ACCESS",
            Opcode::Index => "INDEX",
            Opcode::HasField => "HAS_FIELD",
            Opcode::Call => "CALL",
            Opcode::MakeList => "MAKE_LIST",
            Opcode::MakeMap => "MAKE_MAP",
            Opcode::MakeMsg => "MAKE_MSG",
            Opcode::IterInit => "ITER_INIT",
            Opcode::IterNext => "ITER_NEXT",
            Opcode::ScopePush => "SCOPE_PUSH",
            Opcode::ScopePop => "SCOPE_POP",
            Opcode::BindVar => "BIND_VAR",
            Opcode::ListAppend => "LIST_APPEND",
            Opcode::IntInc => "INT_INC",
            Opcode::Move => "MOVE",
            Opcode::Return => "RETURN",
        }
    }

    /// Meaning of the `(dst, op1, op2, op3)` slots.
    pub fn layout(&self) -> [Operand; 4] {
        use Operand::*;
        match self {
            Opcode::LoadConst => [Register, Constant, Unused, Unused],
            Opcode::LoadVar => [Register, String, Unused, Unused],
            Opcode::LoadTrue | Opcode::LoadFalse | Opcode::LoadNull | Opcode::IntInc => {
                [Register, Unused, Unused, Unused]
            }
            Opcode::Negate | Opcode::Not | Opcode::Move | Opcode::IterInit => {
                [Register, Register, Unused, Unused]
            }
            Opcode::ListAppend => [Register, Register, Unused, Unused],
            Opcode::BinaryOp => [Register, Register, Operator, Register],
            Opcode::JumpIfFalse | Opcode::JumpIfTrue => [Register, Target, Unused, Unused],
            Opcode::Jump => [Unused, Target, Unused, Unused],
            Opcode::CondCheck => [Unused, Register, Role, Unused],
            Opcode::MemberAccess | Opcode::HasField => [Register, Register, String, Unused],
            Opcode::Index => [Register, Register, Register, Unused],
            Opcode::Call => [Register, String, Register, Count],
            Opcode::MakeList | Opcode::MakeMap => [Register, Register, Count, Unused],
            Opcode::MakeMsg => [Register, Register, MessageFields, String],
            Opcode::IterNext => [Register, Register, Target, Unused],
            Opcode::ScopePush | Opcode::ScopePop => [Unused, Unused, Unused, Unused],
            Opcode::BindVar => [Unused, String, Register, Unused],
            Opcode::Return => [Unused, Register, Unused, Unused],
        }
    }

    /// True for opcodes that conditionally branch on a boolean register.
    pub fn is_conditional_jump(&self) -> bool {
        matches!(self, Opcode::JumpIfFalse | Opcode::JumpIfTrue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_opcodes_count() {
        assert_eq!(ALL_OPCODES.len(), 28);
    }

    #[test]
    fn roundtrip_all_valid_opcodes() {
        for &opcode in &ALL_OPCODES {
            let word = opcode as u32;
            let decoded = Opcode::try_from(word).unwrap();
            assert_eq!(opcode, decoded, "roundtrip failed for {opcode:?} ({word:#04x})");
        }
    }

    #[test]
    fn illegal_opcode_zero() {
        assert_eq!(Opcode::try_from(0u32), Err(DecodeError::IllegalOpcode));
    }

    #[test]
    fn unassigned_values_rejected() {
        for word in [0x06u32, 0x13, 0x24, 0x33, 0x41, 0x53, 0x67, 0x71, 0xFF, 0x1_0001] {
            assert_eq!(Opcode::try_from(word), Err(DecodeError::InvalidOpcode(word)));
        }
    }

    #[test]
    fn every_byte_value_resolves() {
        for word in 0..=255u32 {
            match Opcode::try_from(word) {
                Ok(_) | Err(DecodeError::IllegalOpcode) | Err(DecodeError::InvalidOpcode(_)) => {}
                other => panic!("unexpected result for {word:#04x}: {other:?}"),
            }
        }
    }

    #[test]
    fn mnemonics_are_uppercase() {
        for &opcode in &ALL_OPCODES {
            let m = opcode.mnemonic();
            assert!(!m.is_empty(), "empty mnemonic for {opcode:?}");
            assert_eq!(m, m.to_uppercase(), "mnemonic should be uppercase: {m}");
        }
    }

    #[test]
    fn jump_targets_live_in_op1_except_iter_next() {
        for &opcode in &ALL_OPCODES {
            let layout = opcode.layout();
            let target_slots: Vec<_> = layout
                .iter()
                .enumerate()
                .filter(|(_, o)| **o == Operand::Target)
                .map(|(i, _)| i)
                .collect();
            match opcode {
                Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfTrue => {
                    assert_eq!(target_slots, vec![1])
                }
                Opcode::IterNext => assert_eq!(target_slots, vec![2]),
                _ => assert!(target_slots.is_empty(), "{opcode:?} has a target"),
            }
        }
    }
}
