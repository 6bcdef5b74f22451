//! Compiled program representation.
//!
//! A program is a flat array of six-word instruction records plus the
//! pools those records index into. It is produced once by the compiler
//! and is immutable afterwards; it can be shared freely between threads
//! and executed any number of times.

use crate::error::DecodeError;
use crate::instruction::{Instruction, STRIDE};
use crate::span::Span;
use crate::value::Value;

/// An executable program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// Flat instruction words, [`STRIDE`] words per record.
    pub instructions: Vec<u32>,
    /// Literal pool.
    pub constants: Vec<Value>,
    /// Deduplicated identifier / field / function / type names.
    pub strings: Vec<String>,
    /// Source ranges referenced by the span slot of each record.
    pub spans: Vec<Span>,
    /// Registers needed to execute the program.
    pub register_count: u32,
    /// Field names of each message construction site, in emission order.
    pub message_fields: Vec<Vec<String>>,
}

impl Program {
    /// Decode the instruction at word offset `offset`.
    pub fn fetch(&self, offset: usize) -> Result<Instruction, DecodeError> {
        if offset % STRIDE != 0 {
            return Err(DecodeError::Misaligned { offset });
        }
        let words = self
            .instructions
            .get(offset..)
            .ok_or(DecodeError::Truncated { offset })?;
        Instruction::decode(words, offset)
    }

    /// Decode every instruction, paired with its word offset.
    pub fn decode_all(&self) -> Result<Vec<(usize, Instruction)>, DecodeError> {
        (0..self.instructions.len())
            .step_by(STRIDE)
            .map(|offset| self.fetch(offset).map(|instr| (offset, instr)))
            .collect()
    }

    /// Number of instruction records.
    pub fn len(&self) -> usize {
        self.instructions.len() / STRIDE
    }

    /// Returns true if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Span of an instruction, or the default span if the index is out
    /// of range.
    pub fn span(&self, index: u32) -> Span {
        self.spans.get(index as usize).copied().unwrap_or_default()
    }

    /// Interned string by index.
    pub fn string(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }
}
