//! celvm verifier: static checks for compiled programs.
//!
//! The verifier checks a [`Program`] for structural soundness BEFORE
//! execution. Programs produced by the compiler always pass; the checks
//! exist for programs that were stored, transmitted or assembled by hand.
//! It collects ALL errors (not just the first) and returns them.
//!
//! # Usage
//!
//! ```
//! use celvm_common::{Instruction, Opcode, Program, Span};
//! use celvm_verifier::verify;
//!
//! let program = Program {
//!     instructions: [
//!         Instruction::new(Opcode::LoadTrue, 0, 0, 0, 0, 0),
//!         Instruction::new(Opcode::Return, 0, 0, 0, 0, 0),
//!     ]
//!     .iter()
//!     .flat_map(|i| i.encode())
//!     .collect(),
//!     spans: vec![Span::default()],
//!     register_count: 1,
//!     ..Program::default()
//! };
//!
//! assert!(verify(&program).is_ok());
//! ```
//!
//! # Passes
//!
//! 1. **Limits**: register count, instruction count and pool sizes
//! 2. **Structural**: record framing, decoding, final RETURN, jump targets
//! 3. **Operands**: registers, pool indices, operator and role tags
//! 4. **Guards**: every conditional jump rejects non-bool values somewhere
//! 5. **Scopes**: SCOPE_PUSH / SCOPE_POP balance
//!
//! [`hashing::fingerprint`] is separate from verification.

pub mod error;
pub mod guards;
pub mod hashing;
pub mod limits;
pub mod operands;
pub mod scopes;
pub mod structural;

pub use error::VerifyError;
pub use hashing::fingerprint;

use celvm_common::Program;

/// Verify a program.
///
/// Returns `Ok(())` if the program passes all checks, or
/// `Err(Vec<VerifyError>)` with all errors found.
///
/// If the structural pass cannot decode the instruction stream, the
/// passes that walk decoded records are skipped.
pub fn verify(program: &Program) -> Result<(), Vec<VerifyError>> {
    let mut all_errors = Vec::new();

    // Pass 1: Limits (independent)
    all_errors.extend(limits::check_limits(program));

    // Pass 2: Structural (builds ProgramContext)
    let (ctx, structural_errors) = structural::check_structural(program);
    all_errors.extend(structural_errors);

    if !ctx.fatal {
        all_errors.extend(operands::check_operands(program, &ctx));
        all_errors.extend(guards::check_guards(&ctx));
        all_errors.extend(scopes::check_scopes(&ctx));
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors)
    }
}
