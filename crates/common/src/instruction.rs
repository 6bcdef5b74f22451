//! Fixed-width instruction records.
//!
//! Every instruction is exactly six 32-bit words:
//! ```text
//! Word 0: opcode
//! Word 1: dst
//! Word 2: op1
//! Word 3: op2
//! Word 4: op3
//! Word 5: span index
//! ```
//! Instruction offsets count words, so every valid offset is a multiple
//! of [`STRIDE`].

use crate::error::DecodeError;
use crate::opcode::Opcode;

/// Number of words per instruction record.
pub const STRIDE: usize = 6;

/// A single decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The operation to perform.
    pub opcode: Opcode,
    /// Destination register (or tested register for conditional jumps).
    pub dst: u32,
    /// First operand. Meaning depends on opcode.
    pub op1: u32,
    /// Second operand. Meaning depends on opcode.
    pub op2: u32,
    /// Third operand. Meaning depends on opcode.
    pub op3: u32,
    /// Index into the program's span pool.
    pub span: u32,
}

impl Instruction {
    /// Create a new instruction.
    pub fn new(opcode: Opcode, dst: u32, op1: u32, op2: u32, op3: u32, span: u32) -> Self {
        Self {
            opcode,
            dst,
            op1,
            op2,
            op3,
            span,
        }
    }

    /// Encode this instruction to its six-word record.
    pub fn encode(&self) -> [u32; STRIDE] {
        [
            self.opcode as u32,
            self.dst,
            self.op1,
            self.op2,
            self.op3,
            self.span,
        ]
    }

    /// Decode the record starting at `words[0]`.
    ///
    /// `offset` is only used for error reporting.
    pub fn decode(words: &[u32], offset: usize) -> Result<Self, DecodeError> {
        if words.len() < STRIDE {
            return Err(DecodeError::Truncated { offset });
        }
        let opcode = Opcode::try_from(words[0])?;
        Ok(Self {
            opcode,
            dst: words[1],
            op1: words[2],
            op2: words[3],
            op3: words[4],
            span: words[5],
        })
    }

    /// Operand value by slot number (0 = dst, 1..=3 = op1..op3).
    pub fn slot(&self, slot: usize) -> u32 {
        match slot {
            0 => self.dst,
            1 => self.op1,
            2 => self.op2,
            _ => self.op3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip_simple() {
        let instr = Instruction::new(Opcode::BinaryOp, 3, 1, 7, 2, 0);
        let words = instr.encode();
        assert_eq!(Instruction::decode(&words, 0).unwrap(), instr);
    }

    #[test]
    fn encode_decode_roundtrip_all_opcodes() {
        for &opcode in &crate::opcode::ALL_OPCODES {
            let instr = Instruction::new(opcode, 1, 2, 3, 4, 5);
            let decoded = Instruction::decode(&instr.encode(), 0).unwrap();
            assert_eq!(instr, decoded, "roundtrip failed for {opcode:?}");
        }
    }

    #[test]
    fn word_order() {
        let instr = Instruction::new(Opcode::Call, 10, 20, 30, 40, 50);
        assert_eq!(instr.encode(), [0x40, 10, 20, 30, 40, 50]);
    }

    #[test]
    fn decode_rejects_illegal_opcode() {
        assert_eq!(
            Instruction::decode(&[0, 0, 0, 0, 0, 0], 0),
            Err(DecodeError::IllegalOpcode)
        );
    }

    #[test]
    fn decode_rejects_truncated_record() {
        assert_eq!(
            Instruction::decode(&[0x01, 0, 0], 12),
            Err(DecodeError::Truncated { offset: 12 })
        );
    }

    #[test]
    fn slots() {
        let instr = Instruction::new(Opcode::Call, 10, 20, 30, 40, 0);
        assert_eq!(
            (0..4).map(|s| instr.slot(s)).collect::<Vec<_>>(),
            vec![10, 20, 30, 40]
        );
    }
}
