//! Macro lowering.
//!
//! `has(m.f)` becomes a single `HAS_FIELD`. The comprehension macros
//! become an explicit iterator loop in a child variable scope:
//!
//! ```text
//!         ITER_INIT   it, target
//!         <init>      acc
//!         SCOPE_PUSH
//! head:   ITER_NEXT   item, it, @end
//!         BIND_VAR    var, item
//!         <body>      jumps back to head, or to end once decided
//! end:    SCOPE_POP
//!         MOVE        result, acc
//! ```
//!
//! A call whose shape does not match is left to compile as an ordinary
//! function call.

use celvm_common::{ConditionRole, Expr, ExprKind, Opcode, Span};

use crate::codegen::Codegen;
use crate::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comprehension {
    All,
    Exists,
    ExistsOne,
    Filter,
    Map,
    /// Three-argument `map(x, filter, transform)`.
    FilterMap,
}

impl Codegen {
    /// Lower a macro call, or return `None` if the call does not have a
    /// macro's shape.
    pub(crate) fn try_macro(
        &mut self,
        target: Option<&Expr>,
        function: &str,
        args: &[Expr],
        span: Span,
    ) -> Result<Option<u32>, CompileError> {
        if function == "has" {
            return match (target, args) {
                (None, [arg]) => match &arg.unparen().kind {
                    ExprKind::Member { operand, field } => {
                        self.has_field(operand, field, span).map(Some)
                    }
                    _ => Ok(None),
                },
                _ => Ok(None),
            };
        }

        let Some(target) = target else {
            return Ok(None);
        };
        let kind = match (function, args.len()) {
            ("all", 2) => Comprehension::All,
            ("exists", 2) => Comprehension::Exists,
            ("exists_one", 2) => Comprehension::ExistsOne,
            ("filter", 2) => Comprehension::Filter,
            ("map", 2) => Comprehension::Map,
            ("map", 3) => Comprehension::FilterMap,
            _ => return Ok(None),
        };
        let Some(var) = args[0].as_ident() else {
            return Ok(None);
        };
        self.comprehension(kind, target, var, &args[1..], span)
            .map(Some)
    }

    fn has_field(&mut self, operand: &Expr, field: &str, span: Span) -> Result<u32, CompileError> {
        let src = self.expr(operand)?;
        let field = self.intern_string(field, span)?;
        let dst = self.register(span)?;
        self.emit(Opcode::HasField, dst, src, field, 0, span)?;
        Ok(dst)
    }

    fn comprehension(
        &mut self,
        kind: Comprehension,
        target: &Expr,
        var: &str,
        body: &[Expr],
        span: Span,
    ) -> Result<u32, CompileError> {
        let source = self.expr(target)?;
        let iter = self.register(span)?;
        self.emit(Opcode::IterInit, iter, source, 0, 0, span)?;

        let acc = self.register(span)?;
        match kind {
            Comprehension::All => self.emit(Opcode::LoadTrue, acc, 0, 0, 0, span)?,
            Comprehension::Exists => self.emit(Opcode::LoadFalse, acc, 0, 0, 0, span)?,
            Comprehension::ExistsOne => self.emit(Opcode::LoadFalse, acc, 0, 0, 0, span)?,
            Comprehension::Filter | Comprehension::Map | Comprehension::FilterMap => {
                self.emit(Opcode::MakeList, acc, acc, 0, 0, span)?
            }
        };

        self.emit(Opcode::ScopePush, 0, 0, 0, 0, span)?;
        let head = self.here(span)?;
        let item = self.register(span)?;
        let mut exits = vec![self.emit_iter_next(item, iter, span)?];
        let name = self.intern_string(var, span)?;
        self.emit(Opcode::BindVar, 0, name, item, 0, span)?;

        match kind {
            Comprehension::All | Comprehension::Exists => {
                let pred = self.guarded(&body[0], ConditionRole::Predicate)?;
                let (undecided, decided) = if kind == Comprehension::All {
                    (Opcode::JumpIfTrue, Opcode::LoadFalse)
                } else {
                    (Opcode::JumpIfFalse, Opcode::LoadTrue)
                };
                self.emit(undecided, pred, head, 0, 0, span)?;
                self.emit(decided, acc, 0, 0, 0, span)?;
                exits.push(self.emit_jump(Opcode::Jump, 0, span)?);
            }
            Comprehension::ExistsOne => {
                // acc is true once exactly one item has matched; a second
                // match clears it and leaves the loop.
                let pred = self.guarded(&body[0], ConditionRole::Predicate)?;
                self.emit(Opcode::JumpIfFalse, pred, head, 0, 0, span)?;
                self.emit(Opcode::CondCheck, 0, acc, ConditionRole::Predicate.tag(), 0, span)?;
                let second = self.emit_jump(Opcode::JumpIfTrue, acc, span)?;
                self.emit(Opcode::LoadTrue, acc, 0, 0, 0, span)?;
                self.emit(Opcode::Jump, 0, head, 0, 0, span)?;
                self.patch_here(second, span)?;
                self.emit(Opcode::LoadFalse, acc, 0, 0, 0, span)?;
            }
            Comprehension::Filter => {
                let pred = self.guarded(&body[0], ConditionRole::Filter)?;
                self.emit(Opcode::JumpIfFalse, pred, head, 0, 0, span)?;
                self.emit(Opcode::ListAppend, acc, item, 0, 0, span)?;
                self.emit(Opcode::Jump, 0, head, 0, 0, span)?;
            }
            Comprehension::Map => {
                let value = self.expr(&body[0])?;
                self.emit(Opcode::ListAppend, acc, value, 0, 0, span)?;
                self.emit(Opcode::Jump, 0, head, 0, 0, span)?;
            }
            Comprehension::FilterMap => {
                let pred = self.guarded(&body[0], ConditionRole::Filter)?;
                self.emit(Opcode::JumpIfFalse, pred, head, 0, 0, span)?;
                let value = self.expr(&body[1])?;
                self.emit(Opcode::ListAppend, acc, value, 0, 0, span)?;
                self.emit(Opcode::Jump, 0, head, 0, 0, span)?;
            }
        }

        for exit in exits {
            self.patch_here(exit, span)?;
        }
        self.emit(Opcode::ScopePop, 0, 0, 0, 0, span)?;
        let result = self.register(span)?;
        self.emit(Opcode::Move, result, acc, 0, 0, span)?;
        Ok(result)
    }

    /// Compile a predicate and reject non-bool results before any
    /// conditional jump reads it.
    fn guarded(&mut self, expr: &Expr, role: ConditionRole) -> Result<u32, CompileError> {
        let reg = self.expr(expr)?;
        self.emit(Opcode::CondCheck, 0, reg, role.tag(), 0, expr.span)?;
        Ok(reg)
    }
}
