//! Hard limits on program size.

use crate::error::VerifyError;
use celvm_common::Program;

/// Maximum number of registers.
pub const MAX_REGISTERS: u32 = 1 << 16;

/// Maximum number of instruction records.
pub const MAX_INSTRUCTIONS: usize = 1 << 20;

/// Maximum entries in each of the constant, string and span pools.
pub const MAX_POOL_SIZE: usize = 1 << 16;

/// Run the limits check.
pub fn check_limits(program: &Program) -> Vec<VerifyError> {
    let mut errors = Vec::new();

    if program.register_count > MAX_REGISTERS {
        errors.push(VerifyError::TooManyRegisters {
            count: program.register_count,
            max: MAX_REGISTERS,
        });
    }
    if program.len() > MAX_INSTRUCTIONS {
        errors.push(VerifyError::ProgramTooLarge {
            size: program.len(),
            max: MAX_INSTRUCTIONS,
        });
    }

    let pools = [
        ("constant", program.constants.len()),
        ("string", program.strings.len()),
        ("span", program.spans.len()),
        ("message field", program.message_fields.len()),
    ];
    for (pool, size) in pools {
        if size > MAX_POOL_SIZE {
            errors.push(VerifyError::PoolTooLarge {
                pool,
                size,
                max: MAX_POOL_SIZE,
            });
        }
    }

    errors
}
