//! Operator and iteration primitives
//!
//! `add` is the primitive specialized code calls for `+`; the interpreter
//! calls the same function, so both engines agree on results and failures.

use std::sync::Arc;

use crate::backend::error::{EvalError, EvalResult};
use crate::backend::models::Value;
use crate::backend::syntax::BinaryOp;

/// `a + b` over boxed values
pub fn add(a: &Value, b: &Value) -> EvalResult<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x
            .checked_add(*y)
            .map(Value::Int)
            .ok_or(EvalError::IntegerOverflow),
        (Value::String(x), Value::String(y)) => {
            let mut s = String::with_capacity(x.len() + y.len());
            s.push_str(x);
            s.push_str(y);
            Ok(Value::String(Arc::from(s)))
        }
        (Value::List(x), Value::List(y)) => {
            let mut items = Vec::with_capacity(x.len() + y.len());
            items.extend(x.iter().cloned());
            items.extend(y.iter().cloned());
            Ok(Value::list(items))
        }
        _ => Err(unsupported(BinaryOp::Plus, a, b)),
    }
}

/// Any binary operator; only the interpreter reaches the non-`+` arms
pub fn binary(op: BinaryOp, a: &Value, b: &Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Plus => add(a, b),
        BinaryOp::Minus => match (a, b) {
            (Value::Int(x), Value::Int(y)) => x
                .checked_sub(*y)
                .map(Value::Int)
                .ok_or(EvalError::IntegerOverflow),
            _ => Err(unsupported(op, a, b)),
        },
        BinaryOp::Star => match (a, b) {
            (Value::Int(x), Value::Int(y)) => x
                .checked_mul(*y)
                .map(Value::Int)
                .ok_or(EvalError::IntegerOverflow),
            _ => Err(unsupported(op, a, b)),
        },
        BinaryOp::EqualsEquals => Ok(Value::Bool(a == b)),
        BinaryOp::Less => match (a, b) {
            (Value::Int(x), Value::Int(y)) => Ok(Value::Bool(x < y)),
            (Value::String(x), Value::String(y)) => Ok(Value::Bool(x < y)),
            _ => Err(unsupported(op, a, b)),
        },
    }
}

fn unsupported(op: BinaryOp, a: &Value, b: &Value) -> EvalError {
    EvalError::UnsupportedOperands {
        op: op.symbol(),
        lhs: a.type_name(),
        rhs: b.type_name(),
    }
}

/// Truth value of a condition
pub fn truth(value: &Value) -> bool {
    match value {
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Int(n) => *n != 0,
        Value::String(s) => !s.is_empty(),
        Value::List(items) => !items.is_empty(),
        Value::Function(_) | Value::Builtin(_) => true,
    }
}

/// Acquire an iterator over a collection
pub fn iterate(collection: &Value) -> EvalResult<ValueIter> {
    match collection {
        Value::List(items) => Ok(ValueIter {
            items: Arc::clone(items),
            pos: 0,
        }),
        other => Err(EvalError::NotIterable {
            type_name: other.type_name(),
        }),
    }
}

/// Iterator over a snapshot of a collection
///
/// Exhaustion is tested with [`ValueIter::is_exhausted`] before each element
/// is taken, matching the loop protocol both engines follow.
#[derive(Debug, Clone)]
pub struct ValueIter {
    items: Arc<Vec<Value>>,
    pos: usize,
}

impl ValueIter {
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.items.len()
    }
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let item = self.items.get(self.pos).cloned()?;
        self.pos += 1;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_ints_strings_lists() {
        assert_eq!(add(&Value::Int(1), &Value::Int(2)), Ok(Value::Int(3)));
        assert_eq!(
            add(&Value::string("ab"), &Value::string("c")),
            Ok(Value::string("abc"))
        );
        assert_eq!(
            add(&Value::list(vec![Value::Int(1)]), &Value::list(vec![Value::Int(2)])),
            Ok(Value::list(vec![Value::Int(1), Value::Int(2)]))
        );
    }

    #[test]
    fn test_add_failures() {
        assert_eq!(
            add(&Value::Int(1), &Value::string("x")),
            Err(EvalError::UnsupportedOperands { op: "+", lhs: "int", rhs: "string" })
        );
        assert_eq!(
            add(&Value::Int(i64::MAX), &Value::Int(1)),
            Err(EvalError::IntegerOverflow)
        );
    }

    #[test]
    fn test_binary_other_ops() {
        assert_eq!(
            binary(BinaryOp::Minus, &Value::Int(5), &Value::Int(2)),
            Ok(Value::Int(3))
        );
        assert_eq!(
            binary(BinaryOp::Less, &Value::Int(1), &Value::Int(2)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            binary(BinaryOp::EqualsEquals, &Value::Int(1), &Value::string("1")),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn test_iterate() {
        let mut it = iterate(&Value::list(vec![Value::Int(10), Value::Int(20)])).unwrap();
        assert!(!it.is_exhausted());
        assert_eq!(it.next(), Some(Value::Int(10)));
        assert_eq!(it.next(), Some(Value::Int(20)));
        assert!(it.is_exhausted());
        assert_eq!(it.next(), None);

        assert_eq!(
            iterate(&Value::Int(3)).err(),
            Some(EvalError::NotIterable { type_name: "int" })
        );
    }
}
