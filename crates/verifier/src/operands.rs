//! Operand range checks.
//!
//! Every slot is checked against the meaning [`Opcode::layout`] gives it,
//! and register runs read by CALL and the MAKE_* opcodes must fit in the
//! register file.

use crate::error::VerifyError;
use crate::structural::ProgramContext;
use celvm_common::{ConditionRole, Instruction, Opcode, Operand, Program, BINARY_OPERATOR_COUNT};

/// Run the operand pass.
pub fn check_operands(program: &Program, ctx: &ProgramContext) -> Vec<VerifyError> {
    let mut errors = Vec::new();

    for (at, instr) in &ctx.records {
        let at = *at;
        for (slot, operand) in instr.opcode.layout().iter().enumerate() {
            let value = instr.slot(slot);
            match operand {
                Operand::Unused if value != 0 => {
                    errors.push(VerifyError::NonZeroUnusedField { at, slot });
                }
                Operand::Register if value >= program.register_count => {
                    errors.push(VerifyError::RegisterOutOfRange {
                        at,
                        register: u64::from(value),
                        count: program.register_count,
                    });
                }
                Operand::Constant => {
                    check_index(&mut errors, at, "constant", value, program.constants.len())
                }
                Operand::String => check_index(&mut errors, at, "string", value, program.strings.len()),
                Operand::MessageFields => check_index(
                    &mut errors,
                    at,
                    "message field",
                    value,
                    program.message_fields.len(),
                ),
                Operand::Operator if value as usize >= BINARY_OPERATOR_COUNT => {
                    errors.push(VerifyError::InvalidOperator { at, index: value });
                }
                Operand::Role if ConditionRole::from_tag(value).is_none() => {
                    errors.push(VerifyError::InvalidConditionRole { at, role: value });
                }
                _ => {}
            }
        }

        check_index(&mut errors, at, "span", instr.span, program.spans.len());

        if let Some((base, len)) = register_run(program, instr) {
            let end = u64::from(base) + len;
            if len > 0 && end > u64::from(program.register_count) {
                errors.push(VerifyError::RegisterOutOfRange {
                    at,
                    register: end - 1,
                    count: program.register_count,
                });
            }
        }
    }

    errors
}

fn check_index(errors: &mut Vec<VerifyError>, at: usize, pool: &'static str, index: u32, size: usize) {
    if index as usize >= size {
        errors.push(VerifyError::IndexOutOfRange {
            at,
            pool,
            index,
            size,
        });
    }
}

/// Base register and length of the run an instruction reads, if any.
fn register_run(program: &Program, instr: &Instruction) -> Option<(u32, u64)> {
    match instr.opcode {
        Opcode::Call => Some((instr.op2, u64::from(instr.op3))),
        Opcode::MakeList => Some((instr.op1, u64::from(instr.op2))),
        Opcode::MakeMap => Some((instr.op1, 2 * u64::from(instr.op2))),
        Opcode::MakeMsg => program
            .message_fields
            .get(instr.op2 as usize)
            .map(|names| (instr.op1, names.len() as u64)),
        _ => None,
    }
}
