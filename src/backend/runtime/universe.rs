//! Process-wide builtin table
//!
//! Initialized once on first use and never mutated afterwards, so any thread
//! reads it without locking.

use std::collections::HashMap;
use std::sync::LazyLock;

use itertools::Itertools;

use crate::backend::error::{EvalError, EvalResult};
use crate::backend::models::{Builtin, Thread, Value};

static UNIVERSE: LazyLock<HashMap<&'static str, Value>> = LazyLock::new(|| {
    [
        builtin("len", |_thread, args| {
            let [value] = expect_args::<1>("len", args)?;
            let len = match value {
                Value::String(s) => s.chars().count(),
                Value::List(items) => items.len(),
                other => {
                    return Err(EvalError::Builtin {
                        function: "len".into(),
                        message: format!("value of type {} has no len", other.type_name()),
                    })
                }
            };
            Ok(Value::Int(len as i64))
        }),
        builtin("range", |_thread, args| {
            let (start, stop) = match args {
                [stop] => (0, int_arg("range", stop)?),
                [start, stop] => (int_arg("range", start)?, int_arg("range", stop)?),
                _ => {
                    return Err(EvalError::ArityMismatch {
                        function: "range".into(),
                        expected: 2,
                        got: args.len(),
                    })
                }
            };
            Ok(Value::list((start..stop).map(Value::Int).collect()))
        }),
        builtin("str", |_thread, args| {
            let [value] = expect_args::<1>("str", args)?;
            Ok(Value::string(&value.to_string()))
        }),
        builtin("type", |_thread, args| {
            let [value] = expect_args::<1>("type", args)?;
            Ok(Value::string(value.type_name()))
        }),
        builtin("print", |thread, args| {
            thread.print(&args.iter().join(" "));
            Ok(Value::None)
        }),
    ]
    .into_iter()
    .collect()
});

fn builtin<F>(name: &'static str, func: F) -> (&'static str, Value)
where
    F: Fn(&Thread, &[Value]) -> EvalResult<Value> + Send + Sync + 'static,
{
    (name, Value::Builtin(Builtin::new(name, func)))
}

/// Look up a universal name
#[inline]
pub fn lookup(name: &str) -> Option<Value> {
    UNIVERSE.get(name).cloned()
}

/// Sorted list of every universal name
pub fn names() -> Vec<&'static str> {
    UNIVERSE.keys().copied().sorted().collect()
}

fn expect_args<'a, const N: usize>(function: &str, args: &'a [Value]) -> EvalResult<&'a [Value; N]> {
    args.try_into().map_err(|_| EvalError::ArityMismatch {
        function: function.to_string(),
        expected: N,
        got: args.len(),
    })
}

fn int_arg(function: &str, value: &Value) -> EvalResult<i64> {
    value.as_int().ok_or_else(|| EvalError::Builtin {
        function: function.to_string(),
        message: format!("got {}, want int", value.type_name()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> EvalResult<Value> {
        let Some(Value::Builtin(b)) = lookup(name) else {
            panic!("{} is not a builtin", name);
        };
        b.call(&Thread::new(), args)
    }

    #[test]
    fn test_names() {
        assert_eq!(names(), vec!["len", "print", "range", "str", "type"]);
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn test_lookup_returns_same_instance() {
        assert_eq!(lookup("len"), lookup("len"));
    }

    #[test]
    fn test_len_and_range() {
        assert_eq!(call("len", &[Value::string("abc")]), Ok(Value::Int(3)));
        assert_eq!(
            call("range", &[Value::Int(1), Value::Int(4)]),
            Ok(Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
        );
        assert!(matches!(
            call("len", &[Value::Int(1)]),
            Err(EvalError::Builtin { .. })
        ));
        assert!(matches!(
            call("len", &[]),
            Err(EvalError::ArityMismatch { expected: 1, got: 0, .. })
        ));
    }

    #[test]
    fn test_str_and_type() {
        assert_eq!(call("str", &[Value::Int(12)]), Ok(Value::string("12")));
        assert_eq!(call("type", &[Value::None]), Ok(Value::string("NoneType")));
    }
}
