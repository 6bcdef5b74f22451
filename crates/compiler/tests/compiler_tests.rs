//! Integration tests for the celvm compiler.
//!
//! Organized by construct. Execution semantics are covered by the VM
//! tests; these check the emitted code and the program invariants.

use std::sync::Arc;

use celvm_common::expr::build::*;
use celvm_common::{
    BinaryOperator, Expr, ExprKind, Instruction, Opcode, Program, Span, UnaryOperator, Value,
    STRIDE,
};
use celvm_compiler::{compile, Compiler, CompilerOptions};
use proptest::prelude::*;

// ============================================================
// Helper functions
// ============================================================

fn compiled(expr: &Expr) -> Program {
    compile(expr, &CompilerOptions::default()).unwrap()
}

fn records(program: &Program) -> Vec<Instruction> {
    program
        .decode_all()
        .unwrap()
        .into_iter()
        .map(|(_, i)| i)
        .collect()
}

fn opcodes(program: &Program) -> Vec<Opcode> {
    records(program).into_iter().map(|i| i.opcode).collect()
}

/// Every register operand of every record, per its layout.
fn registers_used(program: &Program) -> Vec<u32> {
    let mut regs = Vec::new();
    for instr in records(program) {
        for (slot, operand) in instr.opcode.layout().iter().enumerate() {
            if *operand == celvm_common::Operand::Register {
                regs.push(instr.slot(slot));
            }
        }
    }
    regs
}

// ============================================================
// Program shape
// ============================================================

#[test]
fn every_program_ends_with_return() {
    for expr in [int(1), ident("x"), list(vec![int(1)]), call("f", vec![])] {
        let p = compiled(&expr);
        assert_eq!(opcodes(&p).last(), Some(&Opcode::Return));
    }
}

#[test]
fn return_reads_the_result_register() {
    let p = compiled(&unary(UnaryOperator::Negate, int(3)));
    let instrs = records(&p);
    assert_eq!(instrs[1].opcode, Opcode::Negate);
    assert_eq!(instrs[2].op1, instrs[1].dst);
}

#[test]
fn register_operands_below_register_count() {
    let expr = conditional(
        binary(BinaryOperator::LogicalOr, ident("a"), ident("b")),
        method(list(vec![int(1), int(2)]), "map", vec![ident("x"), ident("x")]),
        map(vec![(string("k"), int(1))]),
    );
    let p = compiled(&expr);
    assert!(registers_used(&p).iter().all(|r| *r < p.register_count));
}

#[test]
fn spans_are_attributed() {
    let expr = Expr::new(
        ExprKind::Binary {
            op: BinaryOperator::Divide,
            left: Box::new(Expr::new(
                ExprKind::Literal(celvm_common::Literal::Int(1)),
                Span::new(0, 1),
            )),
            right: Box::new(Expr::new(
                ExprKind::Literal(celvm_common::Literal::Int(0)),
                Span::new(4, 5),
            )),
        },
        Span::new(0, 5),
    );
    let p = compiled(&expr);
    let div = records(&p)[2];
    assert_eq!(div.opcode, Opcode::BinaryOp);
    assert_eq!(p.span(div.span), Span::new(0, 5));
    assert_eq!(p.spans.len(), 3);
}

// ============================================================
// Literals and pools
// ============================================================

#[test]
fn literal_constants_in_order() {
    let p = compiled(&list(vec![
        uint(7),
        double(1.5),
        string("s"),
        bytes(b"b"),
    ]));
    assert_eq!(
        p.constants,
        vec![
            Value::UInt(7),
            Value::Double(1.5),
            Value::from("s"),
            Value::Bytes(b"b".to_vec())
        ]
    );
}

#[test]
fn names_share_one_string_slot() {
    let p = compiled(&method(member(ident("size"), "size"), "size", vec![]));
    assert_eq!(p.strings, vec!["size".to_string()]);
}

// ============================================================
// Aggregates
// ============================================================

#[test]
fn map_literal_counts_entries() {
    let p = compiled(&map(vec![(string("a"), int(1)), (string("a"), int(2))]));
    let make = records(&p)
        .into_iter()
        .find(|i| i.opcode == Opcode::MakeMap)
        .unwrap();
    assert_eq!(make.op2, 2);
    // keys and values interleave in the block
    let moves: Vec<Instruction> = records(&p)
        .into_iter()
        .filter(|i| i.opcode == Opcode::Move)
        .collect();
    assert_eq!(moves.len(), 4);
    assert_eq!(moves[0].dst, make.op1);
    assert_eq!(moves[3].dst, make.op1 + 3);
}

#[test]
fn message_sites_get_own_field_lists() {
    let p = compiled(&list(vec![
        message("a.B", vec![("x", int(1))]),
        message("a.C", vec![]),
    ]));
    assert_eq!(
        p.message_fields,
        vec![vec!["x".to_string()], Vec::<String>::new()]
    );
}

// ============================================================
// Control flow
// ============================================================

#[test]
fn or_uses_jump_if_true() {
    let p = compiled(&binary(BinaryOperator::LogicalOr, ident("a"), ident("b")));
    assert!(opcodes(&p).contains(&Opcode::JumpIfTrue));
    assert!(!opcodes(&p).contains(&Opcode::CondCheck));
}

#[test]
fn nested_conditionals_patch_every_jump() {
    let expr = conditional(
        ident("a"),
        conditional(ident("b"), int(1), int(2)),
        conditional(ident("c"), int(3), int(4)),
    );
    let p = compiled(&expr);
    let end = p.instructions.len() as u32;
    for instr in records(&p) {
        if matches!(
            instr.opcode,
            Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfTrue
        ) {
            assert!(instr.op1 < end);
            assert_eq!(instr.op1 as usize % STRIDE, 0);
        }
    }
}

// ============================================================
// Memo
// ============================================================

#[test]
fn memo_is_identity_keyed() {
    let mut compiler = Compiler::new(CompilerOptions::default());
    let expr = Arc::new(method(ident("xs"), "exists", vec![ident("x"), bool(true)]));
    let a = compiler.compile(&expr).unwrap();
    let b = compiler.compile(&expr).unwrap();
    let c = compiler.compile(&Arc::new((*expr).clone())).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(*a, *c);
}

// ============================================================
// Properties
// ============================================================

fn arb_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(int),
        any::<bool>().prop_map(bool),
        Just(null()),
        "[a-c]".prop_map(|s| ident(&s)),
    ];
    leaf.prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone())
                .prop_map(|(l, r)| binary(BinaryOperator::Add, l, r)),
            (inner.clone(), inner.clone())
                .prop_map(|(l, r)| binary(BinaryOperator::LogicalAnd, l, r)),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(c, t, e)| conditional(c, t, e)),
            prop::collection::vec(inner.clone(), 0..3).prop_map(list),
            (inner.clone(), inner.clone())
                .prop_map(|(t, p)| method(t, "filter", vec![ident("x"), p])),
            inner.clone().prop_map(|e| unary(UnaryOperator::Not, e)),
        ]
    })
}

proptest! {
    /// Compiling structurally equal trees gives identical programs.
    #[test]
    fn compilation_is_deterministic(expr in arb_expr()) {
        let a = compiled(&expr);
        let b = compiled(&expr.clone());
        prop_assert_eq!(a, b);
    }

    /// Every conditional jump either follows a COND_CHECK on the tested
    /// register or is the skip jump of a short-circuit combine.
    #[test]
    fn conditional_jumps_are_guarded(expr in arb_expr()) {
        let p = compiled(&expr);
        let instrs = p.decode_all().unwrap();
        for (i, (_, instr)) in instrs.iter().enumerate() {
            if !instr.opcode.is_conditional_jump() {
                continue;
            }
            let checked = i > 0
                && instrs[i - 1].1.opcode == Opcode::CondCheck
                && instrs[i - 1].1.op1 == instr.dst;
            let target = instr.op1 as usize / STRIDE;
            let short_circuit = target > 0
                && instrs[target - 1].1.opcode == Opcode::BinaryOp
                && instrs[target - 1].1.dst == instr.dst
                && BinaryOperator::from_index(instrs[target - 1].1.op2 as usize)
                    .map(|op| op.is_short_circuit())
                    .unwrap_or(false);
            prop_assert!(checked || short_circuit, "unguarded jump at record {}", i);
        }
    }
}
