//! Expression tree consumed by the compiler.
//!
//! Trees are produced by an external parser. Every node carries the
//! source span it was parsed from. [`ExprKind`] is `#[non_exhaustive]`:
//! consumers must reject node kinds they do not know how to lower.

use crate::operator::{BinaryOperator, UnaryOperator};
use crate::span::Span;

/// A literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

/// An expression node with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// The node kinds of the expression tree.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ExprKind {
    /// A literal constant.
    Literal(Literal),
    /// `[a, b, c]`
    List(Vec<Expr>),
    /// `{k1: v1, k2: v2}`
    Map(Vec<(Expr, Expr)>),
    /// `pkg.Type{field: value, ...}`
    Message {
        type_name: String,
        fields: Vec<(String, Expr)>,
    },
    /// `-x`, `!x`
    Unary { op: UnaryOperator, operand: Box<Expr> },
    /// `a op b`
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `cond ? then : otherwise`
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// `operand.field`
    Member { operand: Box<Expr>, field: String },
    /// `operand[index]`
    Index { operand: Box<Expr>, index: Box<Expr> },
    /// A variable reference.
    Ident(String),
    /// `function(args)` or `target.function(args)`.
    Call {
        target: Option<Box<Expr>>,
        function: String,
        args: Vec<Expr>,
    },
    /// `(inner)`, transparent to evaluation.
    Paren(Box<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let ExprKind::Paren(inner) = &expr.kind {
            expr = inner;
        }
        expr
    }

    /// The identifier name, if this node is a plain identifier.
    pub fn as_ident(&self) -> Option<&str> {
        match &self.unparen().kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Short node-kind name, used in diagnostics.
    pub fn node_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Literal(_) => "literal",
            ExprKind::List(_) => "list",
            ExprKind::Map(_) => "map",
            ExprKind::Message { .. } => "message",
            ExprKind::Unary { .. } => "unary",
            ExprKind::Binary { .. } => "binary",
            ExprKind::Conditional { .. } => "conditional",
            ExprKind::Member { .. } => "member",
            ExprKind::Index { .. } => "index",
            ExprKind::Ident(_) => "ident",
            ExprKind::Call { .. } => "call",
            ExprKind::Paren(_) => "paren",
        }
    }
}

/// Span-free constructors for building trees by hand.
///
/// Every node gets `Span::default()`. Intended for hosts that assemble
/// expressions programmatically and for tests.
pub mod build {
    use super::*;

    fn node(kind: ExprKind) -> Expr {
        Expr::new(kind, Span::default())
    }

    pub fn null() -> Expr {
        node(ExprKind::Literal(Literal::Null))
    }

    pub fn bool(b: bool) -> Expr {
        node(ExprKind::Literal(Literal::Bool(b)))
    }

    pub fn int(i: i64) -> Expr {
        node(ExprKind::Literal(Literal::Int(i)))
    }

    pub fn uint(u: u64) -> Expr {
        node(ExprKind::Literal(Literal::UInt(u)))
    }

    pub fn double(d: f64) -> Expr {
        node(ExprKind::Literal(Literal::Double(d)))
    }

    pub fn string(s: &str) -> Expr {
        node(ExprKind::Literal(Literal::String(s.to_string())))
    }

    pub fn bytes(b: &[u8]) -> Expr {
        node(ExprKind::Literal(Literal::Bytes(b.to_vec())))
    }

    pub fn ident(name: &str) -> Expr {
        node(ExprKind::Ident(name.to_string()))
    }

    pub fn list(items: Vec<Expr>) -> Expr {
        node(ExprKind::List(items))
    }

    pub fn map(entries: Vec<(Expr, Expr)>) -> Expr {
        node(ExprKind::Map(entries))
    }

    pub fn message(type_name: &str, fields: Vec<(&str, Expr)>) -> Expr {
        node(ExprKind::Message {
            type_name: type_name.to_string(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        })
    }

    pub fn unary(op: UnaryOperator, operand: Expr) -> Expr {
        node(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
        node(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn conditional(condition: Expr, then: Expr, otherwise: Expr) -> Expr {
        node(ExprKind::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    pub fn member(operand: Expr, field: &str) -> Expr {
        node(ExprKind::Member {
            operand: Box::new(operand),
            field: field.to_string(),
        })
    }

    pub fn index(operand: Expr, index: Expr) -> Expr {
        node(ExprKind::Index {
            operand: Box::new(operand),
            index: Box::new(index),
        })
    }

    pub fn call(function: &str, args: Vec<Expr>) -> Expr {
        node(ExprKind::Call {
            target: None,
            function: function.to_string(),
            args,
        })
    }

    pub fn method(target: Expr, function: &str, args: Vec<Expr>) -> Expr {
        node(ExprKind::Call {
            target: Some(Box::new(target)),
            function: function.to_string(),
            args,
        })
    }

    pub fn paren(inner: Expr) -> Expr {
        node(ExprKind::Paren(Box::new(inner)))
    }
}
