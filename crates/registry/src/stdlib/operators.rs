//! Standard operator overloads.

use std::cmp::Ordering;
use std::sync::Arc;

use celvm_common::{
    map_get, BinaryOperator, EvalError, MapKey, Span, UnaryOperator, Value, ValueKind, ValueMap,
    ALL_KINDS,
};

use super::{double_of, int_of, mismatched, uint_of};
use crate::descriptor::{BinaryHandler, BinaryOperatorSet, UnaryOperatorSet};
use crate::error::RegistryError;
use crate::registry::RegistryBuilder;

use celvm_common::ValueKind::{Bool, Bytes, Double, Int, List, Map, String as Str, UInt};

/// Kind pairs accepted by the ordering operators.
const ORDERED_PAIRS: [(ValueKind, ValueKind); 12] = [
    (Bool, Bool),
    (Int, Int),
    (UInt, UInt),
    (Double, Double),
    (Str, Str),
    (Bytes, Bytes),
    (Int, UInt),
    (UInt, Int),
    (Int, Double),
    (Double, Int),
    (UInt, Double),
    (Double, UInt),
];

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder
        .register_binary(&add())?
        .register_binary(&subtract())?
        .register_binary(&multiply())?
        .register_binary(&divide())?
        .register_binary(&modulo())?
        .register_binary(&ordering(BinaryOperator::Less, |o| o == Ordering::Less))?
        .register_binary(&ordering(BinaryOperator::LessEquals, |o| o != Ordering::Greater))?
        .register_binary(&ordering(BinaryOperator::Greater, |o| o == Ordering::Greater))?
        .register_binary(&ordering(BinaryOperator::GreaterEquals, |o| o != Ordering::Less))?
        .register_binary(&equality(BinaryOperator::Equals, true))?
        .register_binary(&equality(BinaryOperator::NotEquals, false))?
        .register_binary(&membership())?
        .register_binary(&logical(BinaryOperator::LogicalAnd))?
        .register_binary(&logical(BinaryOperator::LogicalOr))?
        .register_unary(&negate())?
        .register_unary(&not())?;
    Ok(())
}

fn add() -> BinaryOperatorSet {
    BinaryOperatorSet::new(BinaryOperator::Add)
        .overload(Int, Int, |l, r, span| {
            int_of(l, span)?
                .checked_add(int_of(r, span)?)
                .map(Value::Int)
                .ok_or_else(|| EvalError::overflow(span, "int addition"))
        })
        .overload(UInt, UInt, |l, r, span| {
            uint_of(l, span)?
                .checked_add(uint_of(r, span)?)
                .map(Value::UInt)
                .ok_or_else(|| EvalError::overflow(span, "uint addition"))
        })
        .overload(Double, Double, |l, r, span| {
            Ok(Value::Double(double_of(l, span)? + double_of(r, span)?))
        })
        .overload(Str, Str, |l, r, span| match (l, r) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
            _ => Err(mismatched(span)),
        })
        .overload(Bytes, Bytes, |l, r, span| match (l, r) {
            (Value::Bytes(a), Value::Bytes(b)) => Ok(Value::Bytes([a.as_slice(), b.as_slice()].concat())),
            _ => Err(mismatched(span)),
        })
        .overload(List, List, |l, r, span| match (l, r) {
            (Value::List(a), Value::List(b)) => Ok(Value::List([a.as_slice(), b.as_slice()].concat())),
            _ => Err(mismatched(span)),
        })
}

fn subtract() -> BinaryOperatorSet {
    BinaryOperatorSet::new(BinaryOperator::Subtract)
        .overload(Int, Int, |l, r, span| {
            int_of(l, span)?
                .checked_sub(int_of(r, span)?)
                .map(Value::Int)
                .ok_or_else(|| EvalError::overflow(span, "int subtraction"))
        })
        .overload(UInt, UInt, |l, r, span| {
            uint_of(l, span)?
                .checked_sub(uint_of(r, span)?)
                .map(Value::UInt)
                .ok_or_else(|| EvalError::overflow(span, "uint subtraction"))
        })
        .overload(Double, Double, |l, r, span| {
            Ok(Value::Double(double_of(l, span)? - double_of(r, span)?))
        })
}

fn multiply() -> BinaryOperatorSet {
    BinaryOperatorSet::new(BinaryOperator::Multiply)
        .overload(Int, Int, |l, r, span| {
            int_of(l, span)?
                .checked_mul(int_of(r, span)?)
                .map(Value::Int)
                .ok_or_else(|| EvalError::overflow(span, "int multiplication"))
        })
        .overload(UInt, UInt, |l, r, span| {
            uint_of(l, span)?
                .checked_mul(uint_of(r, span)?)
                .map(Value::UInt)
                .ok_or_else(|| EvalError::overflow(span, "uint multiplication"))
        })
        .overload(Double, Double, |l, r, span| {
            Ok(Value::Double(double_of(l, span)? * double_of(r, span)?))
        })
}

fn divide() -> BinaryOperatorSet {
    BinaryOperatorSet::new(BinaryOperator::Divide)
        .overload(Int, Int, |l, r, span| {
            let (a, b) = (int_of(l, span)?, int_of(r, span)?);
            if b == 0 {
                return Err(EvalError::DivisionByZero { span });
            }
            a.checked_div(b)
                .map(Value::Int)
                .ok_or_else(|| EvalError::overflow(span, "int division"))
        })
        .overload(UInt, UInt, |l, r, span| {
            let (a, b) = (uint_of(l, span)?, uint_of(r, span)?);
            if b == 0 {
                return Err(EvalError::DivisionByZero { span });
            }
            Ok(Value::UInt(a / b))
        })
        // IEEE semantics: x / 0.0 is an infinity or NaN, not an error.
        .overload(Double, Double, |l, r, span| {
            Ok(Value::Double(double_of(l, span)? / double_of(r, span)?))
        })
}

fn modulo() -> BinaryOperatorSet {
    BinaryOperatorSet::new(BinaryOperator::Modulo)
        .overload(Int, Int, |l, r, span| {
            let (a, b) = (int_of(l, span)?, int_of(r, span)?);
            if b == 0 {
                return Err(EvalError::ModulusByZero { span });
            }
            a.checked_rem(b)
                .map(Value::Int)
                .ok_or_else(|| EvalError::overflow(span, "int modulus"))
        })
        .overload(UInt, UInt, |l, r, span| {
            let (a, b) = (uint_of(l, span)?, uint_of(r, span)?);
            if b == 0 {
                return Err(EvalError::ModulusByZero { span });
            }
            Ok(Value::UInt(a % b))
        })
}

fn ordering(op: BinaryOperator, accept: fn(Ordering) -> bool) -> BinaryOperatorSet {
    let handler: BinaryHandler = Arc::new(move |l: &Value, r: &Value, _: Span| {
        Ok(Value::Bool(l.compare(r).map(accept).unwrap_or(false)))
    });
    BinaryOperatorSet::new(op).overload_many(&ORDERED_PAIRS, handler)
}

fn equality(op: BinaryOperator, when_equal: bool) -> BinaryOperatorSet {
    let pairs: Vec<(ValueKind, ValueKind)> = ALL_KINDS
        .iter()
        .flat_map(|&l| ALL_KINDS.iter().map(move |&r| (l, r)))
        .collect();
    let handler: BinaryHandler =
        Arc::new(move |l: &Value, r: &Value, _: Span| Ok(Value::Bool(l.equals(r) == when_equal)));
    BinaryOperatorSet::new(op).overload_many(&pairs, handler)
}

fn membership() -> BinaryOperatorSet {
    let in_list: BinaryHandler = Arc::new(|item: &Value, list: &Value, span: Span| match list {
        Value::List(items) => Ok(Value::Bool(items.iter().any(|v| v.equals(item)))),
        _ => Err(mismatched(span)),
    });
    let in_map: BinaryHandler = Arc::new(|key: &Value, map: &Value, span: Span| match map {
        Value::Map(entries) => Ok(Value::Bool(map_contains(entries, key))),
        _ => Err(mismatched(span)),
    });
    let list_pairs: Vec<(ValueKind, ValueKind)> = ALL_KINDS.iter().map(|&k| (k, List)).collect();
    BinaryOperatorSet::new(BinaryOperator::In)
        .overload_many(&list_pairs, in_list)
        .overload_many(&[(Int, Map), (UInt, Map), (Str, Map)], in_map)
}

/// Key presence with int/uint keys matching across kinds by value.
fn map_contains(map: &ValueMap, key: &Value) -> bool {
    MapKey::from_value(key).is_some_and(|k| map_get(map, &k).is_some())
}

fn logical(op: BinaryOperator) -> BinaryOperatorSet {
    BinaryOperatorSet::new(op).overload(Bool, Bool, move |l, r, span| {
        match (l.as_bool(), r.as_bool()) {
            (Some(a), Some(b)) if op == BinaryOperator::LogicalAnd => Ok(Value::Bool(a && b)),
            (Some(a), Some(b)) => Ok(Value::Bool(a || b)),
            _ => Err(mismatched(span)),
        }
    })
}

fn negate() -> UnaryOperatorSet {
    UnaryOperatorSet::new(UnaryOperator::Negate)
        .overload(Int, |v, span| {
            int_of(v, span)?
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EvalError::overflow(span, "int negation"))
        })
        .overload(Double, |v, span| Ok(Value::Double(-double_of(v, span)?)))
}

fn not() -> UnaryOperatorSet {
    UnaryOperatorSet::new(UnaryOperator::Not).overload(Bool, |v, span| {
        v.as_bool()
            .map(|b| Value::Bool(!b))
            .ok_or_else(|| mismatched(span))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OperationRegistry;

    fn apply(op: BinaryOperator, l: Value, r: Value) -> Result<Value, EvalError> {
        let registry = OperationRegistry::standard().unwrap();
        registry.binary(op.index(), &l, &r, Span::new(0, 1))
    }

    #[test]
    fn int_arithmetic() {
        assert_eq!(apply(BinaryOperator::Add, Value::Int(1), Value::Int(2)), Ok(Value::Int(3)));
        assert_eq!(
            apply(BinaryOperator::Subtract, Value::Int(1), Value::Int(5)),
            Ok(Value::Int(-4))
        );
        assert_eq!(
            apply(BinaryOperator::Multiply, Value::Int(-3), Value::Int(4)),
            Ok(Value::Int(-12))
        );
        assert_eq!(apply(BinaryOperator::Divide, Value::Int(7), Value::Int(2)), Ok(Value::Int(3)));
        assert_eq!(apply(BinaryOperator::Modulo, Value::Int(7), Value::Int(3)), Ok(Value::Int(1)));
    }

    #[test]
    fn int_overflow_is_an_error() {
        assert_eq!(
            apply(BinaryOperator::Add, Value::Int(i64::MAX), Value::Int(1)),
            Err(EvalError::overflow(Span::new(0, 1), "int addition"))
        );
        assert_eq!(
            apply(BinaryOperator::Divide, Value::Int(i64::MIN), Value::Int(-1)),
            Err(EvalError::overflow(Span::new(0, 1), "int division"))
        );
    }

    #[test]
    fn uint_subtraction_underflow() {
        assert_eq!(
            apply(BinaryOperator::Subtract, Value::UInt(5), Value::UInt(10)),
            Err(EvalError::overflow(Span::new(0, 1), "uint subtraction"))
        );
    }

    #[test]
    fn division_and_modulus_by_zero() {
        assert_eq!(
            apply(BinaryOperator::Divide, Value::Int(1), Value::Int(0)),
            Err(EvalError::DivisionByZero { span: Span::new(0, 1) })
        );
        assert_eq!(
            apply(BinaryOperator::Modulo, Value::UInt(1), Value::UInt(0)),
            Err(EvalError::ModulusByZero { span: Span::new(0, 1) })
        );
        match apply(BinaryOperator::Divide, Value::Double(1.0), Value::Double(0.0)) {
            Ok(Value::Double(d)) => assert!(d.is_infinite()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mixed_arithmetic_has_no_overload() {
        assert!(matches!(
            apply(BinaryOperator::Add, Value::Int(1), Value::UInt(1)),
            Err(EvalError::NoSuchOverload { .. })
        ));
        assert!(matches!(
            apply(BinaryOperator::Add, Value::Int(1), Value::Double(1.0)),
            Err(EvalError::NoSuchOverload { .. })
        ));
    }

    #[test]
    fn concatenation() {
        assert_eq!(
            apply(BinaryOperator::Add, Value::from("ab"), Value::from("cd")),
            Ok(Value::from("abcd"))
        );
        assert_eq!(
            apply(BinaryOperator::Add, Value::Bytes(vec![1]), Value::Bytes(vec![2])),
            Ok(Value::Bytes(vec![1, 2]))
        );
        assert_eq!(
            apply(
                BinaryOperator::Add,
                Value::List(vec![Value::Int(1)]),
                Value::List(vec![Value::from("x")])
            ),
            Ok(Value::List(vec![Value::Int(1), Value::from("x")]))
        );
    }

    #[test]
    fn comparisons_cross_numeric_kinds() {
        assert_eq!(apply(BinaryOperator::Less, Value::Int(-1), Value::UInt(0)), Ok(Value::Bool(true)));
        assert_eq!(
            apply(BinaryOperator::GreaterEquals, Value::Double(2.0), Value::Int(2)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            apply(BinaryOperator::LessEquals, Value::from("b"), Value::from("a")),
            Ok(Value::Bool(false))
        );
        assert!(matches!(
            apply(BinaryOperator::Less, Value::Int(1), Value::from("a")),
            Err(EvalError::NoSuchOverload { .. })
        ));
    }

    #[test]
    fn nan_is_unordered() {
        for op in [BinaryOperator::Less, BinaryOperator::GreaterEquals] {
            assert_eq!(
                apply(op, Value::Double(f64::NAN), Value::Double(1.0)),
                Ok(Value::Bool(false))
            );
        }
    }

    #[test]
    fn equality_covers_every_kind_pair() {
        assert_eq!(apply(BinaryOperator::Equals, Value::Int(1), Value::UInt(1)), Ok(Value::Bool(true)));
        assert_eq!(apply(BinaryOperator::Equals, Value::Null, Value::Null), Ok(Value::Bool(true)));
        assert_eq!(
            apply(BinaryOperator::Equals, Value::from("1"), Value::Int(1)),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            apply(BinaryOperator::NotEquals, Value::Bool(true), Value::Null),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn membership_in_list_and_map() {
        let list = Value::List(vec![Value::Int(1), Value::from("a")]);
        assert_eq!(apply(BinaryOperator::In, Value::UInt(1), list.clone()), Ok(Value::Bool(true)));
        assert_eq!(apply(BinaryOperator::In, Value::from("b"), list), Ok(Value::Bool(false)));

        let mut map = ValueMap::new();
        map.insert(MapKey::String("k".into()), Value::Null);
        map.insert(MapKey::Int(3), Value::Null);
        let map = Value::Map(map);
        assert_eq!(apply(BinaryOperator::In, Value::from("k"), map.clone()), Ok(Value::Bool(true)));
        assert_eq!(apply(BinaryOperator::In, Value::UInt(3), map.clone()), Ok(Value::Bool(true)));
        assert_eq!(apply(BinaryOperator::In, Value::Int(4), map.clone()), Ok(Value::Bool(false)));
        assert!(matches!(
            apply(BinaryOperator::In, Value::Double(3.0), map),
            Err(EvalError::NoSuchOverload { .. })
        ));
    }

    #[test]
    fn logical_operators_need_bools() {
        assert_eq!(
            apply(BinaryOperator::LogicalAnd, Value::Bool(true), Value::Bool(false)),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            apply(BinaryOperator::LogicalOr, Value::Bool(false), Value::Bool(true)),
            Ok(Value::Bool(true))
        );
        assert!(matches!(
            apply(BinaryOperator::LogicalAnd, Value::Int(1), Value::Bool(true)),
            Err(EvalError::NoSuchOverload { .. })
        ));
    }

    #[test]
    fn unary_operators() {
        let r = OperationRegistry::standard().unwrap();
        let span = Span::default();
        assert_eq!(r.unary(UnaryOperator::Negate, &Value::Int(5), span), Ok(Value::Int(-5)));
        assert_eq!(
            r.unary(UnaryOperator::Negate, &Value::Double(1.5), span),
            Ok(Value::Double(-1.5))
        );
        assert_eq!(
            r.unary(UnaryOperator::Negate, &Value::Int(i64::MIN), span),
            Err(EvalError::overflow(span, "int negation"))
        );
        assert!(matches!(
            r.unary(UnaryOperator::Negate, &Value::UInt(1), span),
            Err(EvalError::NoSuchOverload { .. })
        ));
        assert_eq!(r.unary(UnaryOperator::Not, &Value::Bool(false), span), Ok(Value::Bool(true)));
    }
}
