//! Compiler entry points and the identity-keyed compile memo.

use std::sync::Arc;

use celvm_common::{Expr, Program};
use tracing::{debug, trace};

use crate::codegen::Codegen;
use crate::error::CompileError;
use crate::options::CompilerOptions;

/// Compile an expression tree to a program.
///
/// Pure function of `expr` and `options`.
pub fn compile(expr: &Expr, options: &CompilerOptions) -> Result<Program, CompileError> {
    let program = Codegen::new(*options).finish(expr)?;
    debug!(
        instructions = program.len(),
        registers = program.register_count,
        constants = program.constants.len(),
        strings = program.strings.len(),
        "compiled expression"
    );
    trace!(listing = %program.disassemble(), "program listing");
    Ok(program)
}

/// A compiler with fixed options and a single-entry memo.
///
/// Compiling the same `Arc<Expr>` allocation twice in a row returns the
/// cached program without running codegen again. The memo compares by
/// pointer identity only; a structurally equal but distinct tree is
/// compiled afresh.
#[derive(Debug, Default)]
pub struct Compiler {
    options: CompilerOptions,
    memo: Option<(Arc<Expr>, Arc<Program>)>,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options, memo: None }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn compile(&mut self, expr: &Arc<Expr>) -> Result<Arc<Program>, CompileError> {
        if let Some((cached, program)) = &self.memo {
            if Arc::ptr_eq(cached, expr) {
                debug!("compile memo hit");
                return Ok(Arc::clone(program));
            }
        }
        let program = Arc::new(compile(expr, &self.options)?);
        self.memo = Some((Arc::clone(expr), Arc::clone(&program)));
        Ok(program)
    }
}
