//! Structural validation pass.
//!
//! Checks record framing, decodability, the terminating RETURN and jump
//! targets, and builds the ProgramContext used by later passes.

use crate::error::VerifyError;
use celvm_common::{Instruction, Opcode, Operand, Program, STRIDE};

/// Context built from the structural pass, consumed by later passes.
#[derive(Debug, Clone, Default)]
pub struct ProgramContext {
    /// Every decoded record with its word offset, in program order.
    pub records: Vec<(usize, Instruction)>,
    /// Whether a fatal structural error occurred (callers should skip later passes).
    pub fatal: bool,
}

impl ProgramContext {
    /// Record index of the instruction at word offset `offset`.
    pub fn index_of(&self, offset: usize) -> Option<usize> {
        (offset % STRIDE == 0 && offset / STRIDE < self.records.len()).then_some(offset / STRIDE)
    }
}

/// Run the structural validation pass.
///
/// Returns the ProgramContext and any errors found.
pub fn check_structural(program: &Program) -> (ProgramContext, Vec<VerifyError>) {
    let mut errors = Vec::new();
    let mut ctx = ProgramContext::default();
    let words = program.instructions.len();

    if words % STRIDE != 0 {
        errors.push(VerifyError::MisalignedLength { len: words });
        ctx.fatal = true;
    }

    for at in (0..words - words % STRIDE).step_by(STRIDE) {
        match program.fetch(at) {
            Ok(instr) => ctx.records.push((at, instr)),
            Err(reason) => {
                errors.push(VerifyError::Undecodable { at, reason });
                ctx.fatal = true;
            }
        }
    }
    if ctx.fatal {
        return (ctx, errors);
    }

    if ctx.records.last().map(|(_, i)| i.opcode) != Some(Opcode::Return) {
        errors.push(VerifyError::MissingReturn);
    }

    for (at, instr) in &ctx.records {
        for (slot, operand) in instr.opcode.layout().iter().enumerate() {
            if *operand != Operand::Target {
                continue;
            }
            let target = instr.slot(slot);
            if ctx.index_of(target as usize).is_none() {
                errors.push(VerifyError::InvalidJumpTarget { at: *at, target });
            }
        }
    }

    (ctx, errors)
}
