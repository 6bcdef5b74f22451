//! Per-compilation code generator.
//!
//! Walks the expression tree depth-first, giving every intermediate
//! result a fresh register. Registers are never reused. Pools are
//! append-only; strings and spans are deduplicated on insertion.

use std::collections::HashMap;

use celvm_common::{
    BinaryOperator, ConditionRole, Expr, ExprKind, Instruction, Literal, Opcode, Program, Span,
    UnaryOperator, Value,
};

use crate::error::CompileError;
use crate::options::CompilerOptions;

/// Target written into a forward jump until it is patched.
pub(crate) const UNPATCHED: u32 = u32::MAX;

// Word positions of op1 and op2 inside a record.
const OP1_WORD: usize = 2;
const OP2_WORD: usize = 3;

/// A forward jump whose target operand has not been written yet.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingJump {
    at: usize,
    word: usize,
}

pub(crate) struct Codegen {
    options: CompilerOptions,
    instructions: Vec<u32>,
    constants: Vec<Value>,
    strings: Vec<String>,
    string_index: HashMap<String, u32>,
    spans: Vec<Span>,
    span_index: HashMap<Span, u32>,
    message_fields: Vec<Vec<String>>,
    next_register: u32,
}

impl Codegen {
    pub(crate) fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            instructions: Vec::new(),
            constants: Vec::new(),
            strings: Vec::new(),
            string_index: HashMap::new(),
            spans: Vec::new(),
            span_index: HashMap::new(),
            message_fields: Vec::new(),
            next_register: 0,
        }
    }

    /// Compile `root` followed by `RETURN` and freeze the result.
    pub(crate) fn finish(mut self, root: &Expr) -> Result<Program, CompileError> {
        let result = self.expr(root)?;
        self.emit(Opcode::Return, 0, result, 0, 0, root.span)?;
        Ok(Program {
            instructions: self.instructions,
            constants: self.constants,
            strings: self.strings,
            spans: self.spans,
            register_count: self.next_register,
            message_fields: self.message_fields,
        })
    }

    // --- allocation and emission ---

    pub(crate) fn register(&mut self, span: Span) -> Result<u32, CompileError> {
        self.register_block(1, span)
    }

    /// Allocate `len` consecutive registers and return the first.
    pub(crate) fn register_block(&mut self, len: usize, span: Span) -> Result<u32, CompileError> {
        let base = self.next_register;
        self.next_register = u32::try_from(len)
            .ok()
            .and_then(|len| base.checked_add(len))
            .ok_or(CompileError::ProgramTooLarge {
                span,
                what: "register count",
            })?;
        Ok(base)
    }

    pub(crate) fn emit(
        &mut self,
        opcode: Opcode,
        dst: u32,
        op1: u32,
        op2: u32,
        op3: u32,
        span: Span,
    ) -> Result<usize, CompileError> {
        let span_index = self.intern_span(span)?;
        let at = self.instructions.len();
        self.instructions
            .extend_from_slice(&Instruction::new(opcode, dst, op1, op2, op3, span_index).encode());
        Ok(at)
    }

    /// Offset of the next record to be emitted.
    pub(crate) fn here(&self, span: Span) -> Result<u32, CompileError> {
        to_u32(self.instructions.len(), span, "instruction offset")
    }

    /// Emit `JUMP`, `JUMP_IF_FALSE` or `JUMP_IF_TRUE` with an unpatched target.
    pub(crate) fn emit_jump(
        &mut self,
        opcode: Opcode,
        tested: u32,
        span: Span,
    ) -> Result<PendingJump, CompileError> {
        let at = self.emit(opcode, tested, UNPATCHED, 0, 0, span)?;
        Ok(PendingJump { at, word: OP1_WORD })
    }

    /// Emit `ITER_NEXT` with an unpatched exhaustion target.
    pub(crate) fn emit_iter_next(
        &mut self,
        item: u32,
        iter: u32,
        span: Span,
    ) -> Result<PendingJump, CompileError> {
        let at = self.emit(Opcode::IterNext, item, iter, UNPATCHED, 0, span)?;
        Ok(PendingJump { at, word: OP2_WORD })
    }

    /// Point `jump` at the next record to be emitted.
    pub(crate) fn patch_here(&mut self, jump: PendingJump, span: Span) -> Result<(), CompileError> {
        let target = self.here(span)?;
        self.instructions[jump.at + jump.word] = target;
        Ok(())
    }

    // --- pools ---

    pub(crate) fn intern_string(&mut self, s: &str, span: Span) -> Result<u32, CompileError> {
        if let Some(&index) = self.string_index.get(s) {
            return Ok(index);
        }
        let index = to_u32(self.strings.len(), span, "string pool")?;
        self.strings.push(s.to_string());
        self.string_index.insert(s.to_string(), index);
        Ok(index)
    }

    fn intern_span(&mut self, span: Span) -> Result<u32, CompileError> {
        if let Some(&index) = self.span_index.get(&span) {
            return Ok(index);
        }
        let index = to_u32(self.spans.len(), span, "span pool")?;
        self.spans.push(span);
        self.span_index.insert(span, index);
        Ok(index)
    }

    pub(crate) fn constant(&mut self, value: Value, span: Span) -> Result<u32, CompileError> {
        let index = to_u32(self.constants.len(), span, "constant pool")?;
        self.constants.push(value);
        Ok(index)
    }

    // --- expressions ---

    /// Compile `expr` and return the register holding its value.
    pub(crate) fn expr(&mut self, expr: &Expr) -> Result<u32, CompileError> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Literal(literal) => self.literal(literal, span),
            ExprKind::Ident(name) => {
                let name = self.intern_string(name, span)?;
                let dst = self.register(span)?;
                self.emit(Opcode::LoadVar, dst, name, 0, 0, span)?;
                Ok(dst)
            }
            ExprKind::List(items) => {
                let regs = items
                    .iter()
                    .map(|item| self.expr(item))
                    .collect::<Result<Vec<_>, _>>()?;
                self.aggregate(Opcode::MakeList, &regs, regs.len(), span)
            }
            ExprKind::Map(entries) => {
                let mut regs = Vec::with_capacity(entries.len() * 2);
                for (key, value) in entries {
                    regs.push(self.expr(key)?);
                    regs.push(self.expr(value)?);
                }
                self.aggregate(Opcode::MakeMap, &regs, entries.len(), span)
            }
            ExprKind::Message { type_name, fields } => {
                self.message(type_name, fields, span)
            }
            ExprKind::Unary { op, operand } => {
                let src = self.expr(operand)?;
                let opcode = match op {
                    UnaryOperator::Negate => Opcode::Negate,
                    UnaryOperator::Not => Opcode::Not,
                };
                let dst = self.register(span)?;
                self.emit(opcode, dst, src, 0, 0, span)?;
                Ok(dst)
            }
            ExprKind::Binary { op, left, right } if op.is_short_circuit() => {
                self.short_circuit(*op, left, right, span)
            }
            ExprKind::Binary { op, left, right } => {
                let lhs = self.expr(left)?;
                let rhs = self.expr(right)?;
                let dst = self.register(span)?;
                self.emit(Opcode::BinaryOp, dst, lhs, op.index() as u32, rhs, span)?;
                Ok(dst)
            }
            ExprKind::Conditional {
                condition,
                then,
                otherwise,
            } => self.conditional(condition, then, otherwise, span),
            ExprKind::Member { operand, field } => {
                let src = self.expr(operand)?;
                let field = self.intern_string(field, span)?;
                let dst = self.register(span)?;
                self.emit(Opcode::MemberAccess, dst, src, field, 0, span)?;
                Ok(dst)
            }
            ExprKind::Index { operand, index } => {
                let src = self.expr(operand)?;
                let key = self.expr(index)?;
                let dst = self.register(span)?;
                self.emit(Opcode::Index, dst, src, key, 0, span)?;
                Ok(dst)
            }
            ExprKind::Call {
                target,
                function,
                args,
            } => {
                if self.options.macros {
                    if let Some(dst) = self.try_macro(target.as_deref(), function, args, span)? {
                        return Ok(dst);
                    }
                }
                self.call(target.as_deref(), function, args, span)
            }
            ExprKind::Paren(inner) => self.expr(inner),
            _ => Err(CompileError::UnsupportedOperation {
                span,
                node: expr.node_name().to_string(),
            }),
        }
    }

    fn literal(&mut self, literal: &Literal, span: Span) -> Result<u32, CompileError> {
        let dst = self.register(span)?;
        let value = match literal {
            Literal::Null => {
                self.emit(Opcode::LoadNull, dst, 0, 0, 0, span)?;
                return Ok(dst);
            }
            Literal::Bool(true) => {
                self.emit(Opcode::LoadTrue, dst, 0, 0, 0, span)?;
                return Ok(dst);
            }
            Literal::Bool(false) => {
                self.emit(Opcode::LoadFalse, dst, 0, 0, 0, span)?;
                return Ok(dst);
            }
            Literal::Int(i) => Value::Int(*i),
            Literal::UInt(u) => Value::UInt(*u),
            Literal::Double(d) => Value::Double(*d),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Bytes(b) => Value::Bytes(b.clone()),
        };
        let index = self.constant(value, span)?;
        self.emit(Opcode::LoadConst, dst, index, 0, 0, span)?;
        Ok(dst)
    }

    /// Copy `regs` into a fresh consecutive block and return its base.
    fn consecutive(&mut self, regs: &[u32], span: Span) -> Result<u32, CompileError> {
        let base = self.register_block(regs.len(), span)?;
        for (i, &src) in regs.iter().enumerate() {
            self.emit(Opcode::Move, base + i as u32, src, 0, 0, span)?;
        }
        Ok(base)
    }

    /// `MAKE_LIST` / `MAKE_MAP` over `regs`; `count` is elements or entries.
    fn aggregate(
        &mut self,
        opcode: Opcode,
        regs: &[u32],
        count: usize,
        span: Span,
    ) -> Result<u32, CompileError> {
        let base = self.consecutive(regs, span)?;
        let count = to_u32(count, span, "element count")?;
        let dst = self.register(span)?;
        self.emit(opcode, dst, base, count, 0, span)?;
        Ok(dst)
    }

    fn message(
        &mut self,
        type_name: &str,
        fields: &[(String, Expr)],
        span: Span,
    ) -> Result<u32, CompileError> {
        let regs = fields
            .iter()
            .map(|(_, value)| self.expr(value))
            .collect::<Result<Vec<_>, _>>()?;
        let base = self.consecutive(&regs, span)?;
        let layout = to_u32(self.message_fields.len(), span, "message field table")?;
        self.message_fields
            .push(fields.iter().map(|(name, _)| name.clone()).collect());
        let type_name = self.intern_string(type_name, span)?;
        let dst = self.register(span)?;
        self.emit(Opcode::MakeMsg, dst, base, layout, type_name, span)?;
        Ok(dst)
    }

    /// `&&` / `||`: the right operand is skipped once the left decides.
    ///
    /// ```text
    ///     MOVE          acc, left
    ///     JUMP_IF_FALSE acc, @done      (JUMP_IF_TRUE for ||)
    ///     <right>
    ///     BINARY_OP     acc, acc, op, right
    /// done:
    /// ```
    ///
    /// A non-bool left operand falls through the jump and fails in
    /// `BINARY_OP` overload resolution.
    fn short_circuit(
        &mut self,
        op: BinaryOperator,
        left: &Expr,
        right: &Expr,
        span: Span,
    ) -> Result<u32, CompileError> {
        let lhs = self.expr(left)?;
        let acc = self.register(span)?;
        self.emit(Opcode::Move, acc, lhs, 0, 0, span)?;
        let skip = match op {
            BinaryOperator::LogicalAnd => Opcode::JumpIfFalse,
            _ => Opcode::JumpIfTrue,
        };
        let done = self.emit_jump(skip, acc, span)?;
        let rhs = self.expr(right)?;
        self.emit(Opcode::BinaryOp, acc, acc, op.index() as u32, rhs, span)?;
        self.patch_here(done, span)?;
        Ok(acc)
    }

    fn conditional(
        &mut self,
        condition: &Expr,
        then: &Expr,
        otherwise: &Expr,
        span: Span,
    ) -> Result<u32, CompileError> {
        let cond = self.expr(condition)?;
        self.emit(
            Opcode::CondCheck,
            0,
            cond,
            ConditionRole::Conditional.tag(),
            0,
            condition.span,
        )?;
        let to_else = self.emit_jump(Opcode::JumpIfFalse, cond, span)?;
        let result = self.register(span)?;

        let value = self.expr(then)?;
        self.emit(Opcode::Move, result, value, 0, 0, span)?;
        let to_end = self.emit_jump(Opcode::Jump, 0, span)?;

        self.patch_here(to_else, span)?;
        let value = self.expr(otherwise)?;
        self.emit(Opcode::Move, result, value, 0, 0, span)?;
        self.patch_here(to_end, span)?;
        Ok(result)
    }

    fn call(
        &mut self,
        target: Option<&Expr>,
        function: &str,
        args: &[Expr],
        span: Span,
    ) -> Result<u32, CompileError> {
        let mut regs = Vec::with_capacity(args.len() + 1);
        if let Some(target) = target {
            regs.push(self.expr(target)?);
        }
        for arg in args {
            regs.push(self.expr(arg)?);
        }
        let base = self.consecutive(&regs, span)?;
        let name = self.intern_string(function, span)?;
        let count = to_u32(regs.len(), span, "argument count")?;
        let dst = self.register(span)?;
        self.emit(Opcode::Call, dst, name, base, count, span)?;
        Ok(dst)
    }
}

fn to_u32(n: usize, span: Span, what: &'static str) -> Result<u32, CompileError> {
    u32::try_from(n).map_err(|_| CompileError::ProgramTooLarge { span, what })
}

#[cfg(test)]
mod tests {
    use super::*;
    use celvm_common::expr::build::*;

    fn compile(expr: &Expr) -> Program {
        Codegen::new(CompilerOptions::default()).finish(expr).unwrap()
    }

    fn opcodes(program: &Program) -> Vec<Opcode> {
        program
            .decode_all()
            .unwrap()
            .into_iter()
            .map(|(_, i)| i.opcode)
            .collect()
    }

    #[test]
    fn literal_fast_paths() {
        assert_eq!(opcodes(&compile(&bool(true))), [Opcode::LoadTrue, Opcode::Return]);
        assert_eq!(opcodes(&compile(&null())), [Opcode::LoadNull, Opcode::Return]);
        let p = compile(&int(42));
        assert_eq!(opcodes(&p), [Opcode::LoadConst, Opcode::Return]);
        assert_eq!(p.constants, vec![Value::Int(42)]);
        assert_eq!(p.register_count, 1);
    }

    #[test]
    fn strings_are_deduplicated() {
        let p = compile(&binary(BinaryOperator::Add, ident("x"), ident("x")));
        assert_eq!(p.strings, vec!["x".to_string()]);
    }

    #[test]
    fn spans_are_deduplicated() {
        let p = compile(&binary(BinaryOperator::Add, int(1), int(2)));
        assert_eq!(p.spans, vec![Span::default()]);
    }

    #[test]
    fn registers_are_never_reused() {
        let p = compile(&binary(BinaryOperator::Add, int(1), int(2)));
        let instrs = p.decode_all().unwrap();
        let add = instrs[2].1;
        assert_eq!(add.opcode, Opcode::BinaryOp);
        assert_eq!((add.op1, add.op3, add.dst), (0, 1, 2));
        assert_eq!(add.op2, BinaryOperator::Add.index() as u32);
        assert_eq!(p.register_count, 3);
    }

    #[test]
    fn call_arguments_are_moved_into_consecutive_block() {
        let p = compile(&method(ident("s"), "contains", vec![string("a")]));
        let instrs: Vec<Instruction> = p.decode_all().unwrap().into_iter().map(|(_, i)| i).collect();
        // LOAD_VAR r0, LOAD_CONST r1, MOVE r2<-r0, MOVE r3<-r1, CALL r4
        assert_eq!(instrs[2], Instruction::new(Opcode::Move, 2, 0, 0, 0, 0));
        assert_eq!(instrs[3], Instruction::new(Opcode::Move, 3, 1, 0, 0, 0));
        assert_eq!(instrs[4].opcode, Opcode::Call);
        assert_eq!((instrs[4].op2, instrs[4].op3), (2, 2));
        assert_eq!(p.string(instrs[4].op1), Some("contains"));
    }

    #[test]
    fn short_circuit_jump_lands_after_combine() {
        let p = compile(&binary(BinaryOperator::LogicalAnd, bool(false), ident("x")));
        let instrs = p.decode_all().unwrap();
        let (_, jump) = instrs[2];
        assert_eq!(jump.opcode, Opcode::JumpIfFalse);
        let (combine_at, combine) = instrs[4];
        assert_eq!(combine.opcode, Opcode::BinaryOp);
        assert_eq!(jump.op1 as usize, combine_at + celvm_common::STRIDE);
        assert_eq!(combine.dst, jump.dst);
    }

    #[test]
    fn conditional_is_guarded_and_patched() {
        let p = compile(&conditional(ident("c"), int(1), int(2)));
        let ops = opcodes(&p);
        assert_eq!(
            ops,
            [
                Opcode::LoadVar,
                Opcode::CondCheck,
                Opcode::JumpIfFalse,
                Opcode::LoadConst,
                Opcode::Move,
                Opcode::Jump,
                Opcode::LoadConst,
                Opcode::Move,
                Opcode::Return,
            ]
        );
        let instrs = p.decode_all().unwrap();
        assert_eq!(instrs[2].1.op1, 6 * 6);
        assert_eq!(instrs[5].1.op1, 8 * 6);
        assert!(!p.instructions.contains(&UNPATCHED));
    }

    #[test]
    fn message_records_field_layout() {
        let p = compile(&message("acme.Point", vec![("x", int(1)), ("y", int(2))]));
        assert_eq!(p.message_fields, vec![vec!["x".to_string(), "y".to_string()]]);
        let (_, make) = p.decode_all().unwrap()[4];
        assert_eq!(make.opcode, Opcode::MakeMsg);
        assert_eq!(make.op2, 0);
        assert_eq!(p.string(make.op3), Some("acme.Point"));
    }

    #[test]
    fn empty_list_has_zero_count() {
        let p = compile(&list(vec![]));
        let (_, make) = p.decode_all().unwrap()[0];
        assert_eq!(make.opcode, Opcode::MakeList);
        assert_eq!(make.op2, 0);
    }

    #[test]
    fn parens_are_transparent() {
        assert_eq!(compile(&paren(paren(int(1)))), compile(&int(1)));
    }
}
