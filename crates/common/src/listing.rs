//! Program listing: compiled program → human-readable text.
//!
//! One instruction per line, prefixed with its word offset. Operands are
//! rendered according to [`Opcode::layout`]: registers as `rN`, jump
//! targets as `@N`, pool references resolved to their contents.

use std::fmt::Write;

use crate::error::ConditionRole;
use crate::instruction::Instruction;
use crate::opcode::Operand;
use crate::operator::BinaryOperator;
use crate::program::Program;

impl Program {
    /// Render the program as a listing.
    ///
    /// Undecodable records are rendered as `<invalid: ...>` rather than
    /// aborting the listing.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let mut offset = 0;
        while offset < self.instructions.len() {
            let line = match self.fetch(offset) {
                Ok(instr) => self.render(&instr),
                Err(e) => format!("<invalid: {e}>"),
            };
            let _ = writeln!(out, "{offset:04}  {line}");
            offset += crate::instruction::STRIDE;
        }
        out
    }

    fn render(&self, instr: &Instruction) -> String {
        let mut parts = vec![instr.opcode.mnemonic().to_string()];
        for (slot, operand) in instr.opcode.layout().iter().enumerate() {
            let raw = instr.slot(slot);
            let text = match operand {
                Operand::Unused => continue,
                Operand::Register => format!("r{raw}"),
                Operand::Target => format!("@{raw}"),
                Operand::Count => raw.to_string(),
                Operand::Constant => match self.constants.get(raw as usize) {
                    Some(value) => format!("#{raw}({value})"),
                    None => format!("#{raw}(?)"),
                },
                Operand::String => match self.string(raw) {
                    Some(s) => format!("{s:?}"),
                    None => format!("${raw}(?)"),
                },
                Operand::Operator => match BinaryOperator::from_index(raw as usize) {
                    Some(op) => op.symbol().to_string(),
                    None => format!("op{raw}(?)"),
                },
                Operand::Role => match ConditionRole::from_tag(raw) {
                    Some(ConditionRole::Conditional) => "cond".to_string(),
                    Some(ConditionRole::Predicate) => "predicate".to_string(),
                    Some(ConditionRole::Filter) => "filter".to_string(),
                    None => format!("role{raw}(?)"),
                },
                Operand::MessageFields => match self.message_fields.get(raw as usize) {
                    Some(fields) => format!("[{}]", fields.join(", ")),
                    None => format!("fields{raw}(?)"),
                },
            };
            parts.push(text);
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use crate::instruction::Instruction;
    use crate::opcode::Opcode;
    use crate::program::Program;
    use crate::value::Value;

    fn program(instrs: &[Instruction]) -> Program {
        Program {
            instructions: instrs.iter().flat_map(|i| i.encode()).collect(),
            constants: vec![Value::Int(1), Value::Int(2)],
            strings: vec!["x".to_string()],
            register_count: 4,
            ..Program::default()
        }
    }

    #[test]
    fn renders_operands_by_layout() {
        let p = program(&[
            Instruction::new(Opcode::LoadConst, 0, 0, 0, 0, 0),
            Instruction::new(Opcode::LoadConst, 1, 1, 0, 0, 0),
            Instruction::new(Opcode::BinaryOp, 2, 0, 7, 1, 0),
            Instruction::new(Opcode::Return, 0, 2, 0, 0, 0),
        ]);
        assert_eq!(
            p.disassemble(),
            "0000  LOAD_CONST r0 #0(1)\n\
             0006  LOAD_CONST r1 #1(2)\n\
             0012  BINARY_OP r2 r0 + r1\n\
             0018  RETURN r2\n"
        );
    }

    #[test]
    fn renders_jumps_and_roles() {
        let p = program(&[
            Instruction::new(Opcode::LoadVar, 0, 0, 0, 0, 0),
            Instruction::new(Opcode::CondCheck, 0, 0, 0, 0, 0),
            Instruction::new(Opcode::JumpIfFalse, 0, 24, 0, 0, 0),
        ]);
        let text = p.disassemble();
        assert!(text.contains("LOAD_VAR r0 \"x\""), "{text}");
        assert!(text.contains("COND_CHECK r0 cond"), "{text}");
        assert!(text.contains("JUMP_IF_FALSE r0 @24"), "{text}");
    }

    #[test]
    fn invalid_records_do_not_abort() {
        let mut p = program(&[Instruction::new(Opcode::LoadNull, 0, 0, 0, 0, 0)]);
        p.instructions.extend_from_slice(&[0x99, 0, 0, 0, 0, 0]);
        let text = p.disassemble();
        assert!(text.contains("0006  <invalid: invalid opcode: 0x99>"), "{text}");
    }
}
