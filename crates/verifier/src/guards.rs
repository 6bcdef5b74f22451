//! Conditional jump guard check.
//!
//! JUMP_IF_FALSE and JUMP_IF_TRUE fall through on a non-bool register.
//! That is only sound when something else rejects the value: either a
//! COND_CHECK on the tested register immediately before the jump, or
//! the `&&`/`||` BINARY_OP that the skip jump lands right after, which
//! has no overload for a non-bool operand.

use crate::error::VerifyError;
use crate::structural::ProgramContext;
use celvm_common::{BinaryOperator, Instruction, Opcode};

/// Run the guard pass.
pub fn check_guards(ctx: &ProgramContext) -> Vec<VerifyError> {
    let mut errors = Vec::new();

    for (i, (at, instr)) in ctx.records.iter().enumerate() {
        if !instr.opcode.is_conditional_jump() {
            continue;
        }
        let checked = i
            .checked_sub(1)
            .map(|prev| is_check_of(&ctx.records[prev].1, instr.dst))
            .unwrap_or(false);
        let short_circuit = ctx
            .index_of(instr.op1 as usize)
            .and_then(|target| target.checked_sub(1))
            .map(|before| is_short_circuit_of(&ctx.records[before].1, instr.dst))
            .unwrap_or(false);
        if !checked && !short_circuit {
            errors.push(VerifyError::UnguardedJump { at: *at });
        }
    }

    errors
}

fn is_check_of(instr: &Instruction, reg: u32) -> bool {
    instr.opcode == Opcode::CondCheck && instr.op1 == reg
}

fn is_short_circuit_of(instr: &Instruction, reg: u32) -> bool {
    instr.opcode == Opcode::BinaryOp
        && instr.dst == reg
        && BinaryOperator::from_index(instr.op2 as usize)
            .map(|op| op.is_short_circuit())
            .unwrap_or(false)
}
