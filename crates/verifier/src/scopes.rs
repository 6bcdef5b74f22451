//! SCOPE_PUSH / SCOPE_POP balance.
//!
//! The compiler emits each push and its pop around a single loop, so the
//! pairs must nest in emission order and close before RETURN.

use crate::error::VerifyError;
use crate::structural::ProgramContext;
use celvm_common::Opcode;

/// Run the scope balance pass.
pub fn check_scopes(ctx: &ProgramContext) -> Vec<VerifyError> {
    let mut errors = Vec::new();
    let mut open = 0usize;

    for (at, instr) in &ctx.records {
        match instr.opcode {
            Opcode::ScopePush => open += 1,
            Opcode::ScopePop => match open.checked_sub(1) {
                Some(rest) => open = rest,
                None => errors.push(VerifyError::UnbalancedScopePop { at: *at }),
            },
            _ => {}
        }
    }
    if open > 0 {
        errors.push(VerifyError::UnclosedScopes { open });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use celvm_common::Instruction;

    fn ctx_of(ops: &[Opcode]) -> ProgramContext {
        ProgramContext {
            records: ops
                .iter()
                .enumerate()
                .map(|(i, op)| (i * celvm_common::STRIDE, Instruction::new(*op, 0, 0, 0, 0, 0)))
                .collect(),
            fatal: false,
        }
    }

    #[test]
    fn nested_pairs_balance() {
        let ctx = ctx_of(&[
            Opcode::ScopePush,
            Opcode::ScopePush,
            Opcode::ScopePop,
            Opcode::ScopePop,
            Opcode::Return,
        ]);
        assert!(check_scopes(&ctx).is_empty());
    }

    #[test]
    fn pop_before_push() {
        let ctx = ctx_of(&[Opcode::ScopePop, Opcode::ScopePush, Opcode::Return]);
        assert_eq!(
            check_scopes(&ctx),
            vec![
                VerifyError::UnbalancedScopePop { at: 0 },
                VerifyError::UnclosedScopes { open: 1 },
            ]
        );
    }
}
