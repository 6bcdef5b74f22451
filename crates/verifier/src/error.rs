//! Verification errors.
//!
//! Every error that concerns one instruction carries its word offset
//! (`at`). The verifier collects all errors, not just the first.

use celvm_common::DecodeError;
use thiserror::Error;

/// Errors found during static verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    // --- Limits ---
    #[error("program needs {count} registers (max {max})")]
    TooManyRegisters { count: u32, max: u32 },

    #[error("{pool} pool has {size} entries (max {max})")]
    PoolTooLarge {
        pool: &'static str,
        size: usize,
        max: usize,
    },

    #[error("program too large: {size} instructions (max {max})")]
    ProgramTooLarge { size: usize, max: usize },

    // --- Structural ---
    /// Instruction array length is not a multiple of the record stride.
    #[error("instruction array of {len} words is not a whole number of records")]
    MisalignedLength { len: usize },

    #[error("undecodable instruction at offset {at}: {reason}")]
    Undecodable { at: usize, reason: DecodeError },

    #[error("program does not end with RETURN")]
    MissingReturn,

    /// Jump or iterator-exit target misaligned or past the end.
    #[error("invalid jump target {target} at offset {at}")]
    InvalidJumpTarget { at: usize, target: u32 },

    // --- Operands ---
    #[error("register r{register} out of range at offset {at} ({count} registers)")]
    RegisterOutOfRange { at: usize, register: u64, count: u32 },

    #[error("{pool} index {index} out of range at offset {at} ({size} entries)")]
    IndexOutOfRange {
        at: usize,
        pool: &'static str,
        index: u32,
        size: usize,
    },

    #[error("invalid binary operator index {index} at offset {at}")]
    InvalidOperator { at: usize, index: u32 },

    #[error("invalid condition role {role} at offset {at}")]
    InvalidConditionRole { at: usize, role: u32 },

    #[error("non-zero unused slot {slot} at offset {at}")]
    NonZeroUnusedField { at: usize, slot: usize },

    // --- Guards ---
    /// Conditional jump neither checked by COND_CHECK nor a short-circuit skip.
    #[error("unguarded conditional jump at offset {at}")]
    UnguardedJump { at: usize },

    // --- Scopes ---
    #[error("SCOPE_POP without matching SCOPE_PUSH at offset {at}")]
    UnbalancedScopePop { at: usize },

    #[error("{open} scope(s) still open at RETURN")]
    UnclosedScopes { open: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_variants_display() {
        let errors: Vec<VerifyError> = vec![
            VerifyError::TooManyRegisters { count: 9, max: 8 },
            VerifyError::PoolTooLarge {
                pool: "constant",
                size: 9,
                max: 8,
            },
            VerifyError::ProgramTooLarge { size: 9, max: 8 },
            VerifyError::MisalignedLength { len: 7 },
            VerifyError::Undecodable {
                at: 0,
                reason: DecodeError::IllegalOpcode,
            },
            VerifyError::MissingReturn,
            VerifyError::InvalidJumpTarget { at: 0, target: 5 },
            VerifyError::RegisterOutOfRange {
                at: 0,
                register: 3,
                count: 2,
            },
            VerifyError::IndexOutOfRange {
                at: 0,
                pool: "string",
                index: 1,
                size: 0,
            },
            VerifyError::InvalidOperator { at: 0, index: 14 },
            VerifyError::InvalidConditionRole { at: 0, role: 3 },
            VerifyError::NonZeroUnusedField { at: 0, slot: 3 },
            VerifyError::UnguardedJump { at: 6 },
            VerifyError::UnbalancedScopePop { at: 0 },
            VerifyError::UnclosedScopes { open: 1 },
        ];

        for error in &errors {
            let display = error.to_string();
            assert!(!display.is_empty(), "empty display for {error:?}");
        }
        assert_eq!(errors.len(), 15);
    }
}
