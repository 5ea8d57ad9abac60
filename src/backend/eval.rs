//! Tree-walking interpreter
//!
//! The reference engine: every construct in the syntax tree is supported
//! here, and any function the specializer cannot handle runs through it.
//! Storage, operators and calls all go through [`crate::backend::runtime`],
//! the same primitives the bytecode executor uses.

use std::sync::Arc;

use tracing::trace;

use crate::backend::error::{EvalError, EvalResult};
use crate::backend::models::{Callable, Frame, FunctionCode, Value};
use crate::backend::runtime::{self, bindings, Args, Kwargs};
use crate::backend::syntax::{Argument, Expression, Identifier, Statement};

/// Interpreted code for a function
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter;

impl FunctionCode for Interpreter {
    fn call(&self, frame: &mut Frame<'_>) -> EvalResult<Value> {
        let def = Arc::clone(frame.function().def());
        match exec_block(frame, def.body())? {
            Flow::Return(value) => Ok(value),
            Flow::Next => Ok(Value::None),
        }
    }

    fn describe(&self) -> String {
        "interpreted".to_string()
    }
}

/// Outcome of executing a statement
enum Flow {
    Next,
    Return(Value),
}

fn exec_block(frame: &mut Frame<'_>, body: &[Statement]) -> EvalResult<Flow> {
    for statement in body {
        if let Flow::Return(value) = exec_statement(frame, statement)? {
            return Ok(Flow::Return(value));
        }
    }
    Ok(Flow::Next)
}

fn exec_statement(frame: &mut Frame<'_>, statement: &Statement) -> EvalResult<Flow> {
    if frame.thread().config().trace {
        trace!(target: "hotpath::eval", kind = ?statement.kind(), "exec");
    }

    match statement {
        Statement::Return(value) => {
            let value = match value {
                Some(expr) => eval_expression(frame, expr)?,
                None => Value::None,
            };
            Ok(Flow::Return(value))
        }

        Statement::Expression(expr) => {
            eval_expression(frame, expr)?;
            Ok(Flow::Next)
        }

        Statement::Def { target, function } => {
            let closure =
                Callable::new_closure(Arc::clone(function), frame.function(), frame.thread());
            bindings::store(frame, &target.binding, Value::Function(closure))?;
            Ok(Flow::Next)
        }

        Statement::For {
            target,
            collection,
            body,
        } => {
            let collection = eval_expression(frame, collection)?;
            let mut iter = runtime::iterate(&collection)?;
            while !iter.is_exhausted() {
                let Some(item) = iter.next() else { break };
                assign_target(frame, target, item)?;
                if let Flow::Return(value) = exec_block(frame, body)? {
                    return Ok(Flow::Return(value));
                }
            }
            Ok(Flow::Next)
        }

        Statement::If {
            condition,
            then_body,
            else_body,
        } => {
            let condition = eval_expression(frame, condition)?;
            if runtime::truth(&condition) {
                exec_block(frame, then_body)
            } else {
                exec_block(frame, else_body)
            }
        }

        Statement::Assignment { target, value } => {
            let value = eval_expression(frame, value)?;
            bindings::store(frame, &target.binding, value)?;
            Ok(Flow::Next)
        }

        Statement::Pass => Ok(Flow::Next),
    }
}

/// Bind one loop element to a plain or unpacking target
fn assign_target(frame: &mut Frame<'_>, target: &Expression, value: Value) -> EvalResult<()> {
    match target {
        Expression::Identifier(Identifier { binding }) => bindings::store(frame, binding, value),
        Expression::ListExpr(targets) => {
            let items: Vec<Value> = runtime::iterate(&value)?.collect();
            if items.len() != targets.len() {
                return Err(EvalError::UnpackMismatch {
                    expected: targets.len(),
                    got: items.len(),
                });
            }
            for (target, item) in targets.iter().zip(items) {
                assign_target(frame, target, item)?;
            }
            Ok(())
        }
        other => Err(EvalError::Internal(format!(
            "cannot assign to {:?}",
            other.kind()
        ))),
    }
}

fn eval_expression(frame: &Frame<'_>, expr: &Expression) -> EvalResult<Value> {
    match expr {
        Expression::Identifier(Identifier { binding }) => bindings::load(frame, binding),
        Expression::IntLiteral(n) => Ok(Value::Int(*n)),
        Expression::StringLiteral(s) => Ok(Value::String(Arc::clone(s))),

        Expression::BinaryOperator { op, lhs, rhs } => {
            let lhs = eval_expression(frame, lhs)?;
            let rhs = eval_expression(frame, rhs)?;
            runtime::binary(*op, &lhs, &rhs)
        }

        Expression::Call { callee, args } => {
            let callee = eval_expression(frame, callee)?;
            let mut positional = Args::new();
            let mut keywords = Kwargs::new();
            for arg in args {
                match arg {
                    Argument::Positional(value) => positional.push(eval_expression(frame, value)?),
                    Argument::Keyword { name, value } => {
                        keywords.push((Arc::clone(name), eval_expression(frame, value)?))
                    }
                }
            }
            runtime::invoke(frame.thread(), &callee, positional, keywords)
        }

        Expression::ListExpr(items) => {
            let values = items
                .iter()
                .map(|item| eval_expression(frame, item))
                .collect::<EvalResult<Vec<_>>>()?;
            Ok(Value::list(values))
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::backend::models::Thread;
    use crate::backend::syntax::{BinaryOp, ResolvedFunction};

    fn run(def: Arc<ResolvedFunction>, args: Vec<Value>) -> EvalResult<Value> {
        let thread = Thread::new();
        let f = Value::Function(Callable::new(def, Arc::new(Interpreter)));
        runtime::invoke(&thread, &f, args.into_iter().collect(), Kwargs::new())
    }

    #[test]
    fn test_return_sum() {
        let def = ResolvedFunction::builder("f")
            .stmt(Statement::ret(Expression::add(Expression::int(1), Expression::int(2))))
            .build();
        assert_eq!(run(def, vec![]), Ok(Value::Int(3)));
    }

    #[test]
    fn test_fall_off_returns_none() {
        let def = ResolvedFunction::builder("f").stmt(Statement::Pass).build();
        assert_eq!(run(def, vec![]), Ok(Value::None));
    }

    #[test]
    fn test_if_and_assignment() {
        // def f(x):
        //     if x < 10: y = "small"
        //     else: y = "big"
        //     return y
        let y = Identifier::local("y", 1);
        let def = ResolvedFunction::builder("f")
            .param("x")
            .locals(2)
            .stmt(Statement::If {
                condition: Expression::binary(
                    BinaryOp::Less,
                    Expression::local("x", 0),
                    Expression::int(10),
                ),
                then_body: vec![Statement::assign(y.clone(), Expression::string("small"))],
                else_body: vec![Statement::assign(y, Expression::string("big"))],
            })
            .stmt(Statement::ret(Expression::local("y", 1)))
            .build();
        assert_eq!(run(Arc::clone(&def), vec![Value::Int(3)]), Ok(Value::string("small")));
        assert_eq!(run(def, vec![Value::Int(30)]), Ok(Value::string("big")));
    }

    #[test]
    fn test_for_accumulates_in_order() {
        // def f(xs):
        //     acc = ""
        //     for x in xs: acc = acc + x
        //     return acc
        let acc = Identifier::local("acc", 1);
        let def = ResolvedFunction::builder("f")
            .param("xs")
            .locals(3)
            .stmt(Statement::assign(acc.clone(), Expression::string("")))
            .stmt(Statement::for_each(
                Identifier::local("x", 2),
                Expression::local("xs", 0),
                vec![Statement::assign(
                    acc,
                    Expression::add(Expression::local("acc", 1), Expression::local("x", 2)),
                )],
            ))
            .stmt(Statement::ret(Expression::local("acc", 1)))
            .build();
        let xs = Value::list(vec![Value::string("a"), Value::string("b"), Value::string("c")]);
        assert_eq!(run(def, vec![xs]), Ok(Value::string("abc")));
    }

    #[test]
    fn test_for_unpacking_target() {
        // def f(pairs):
        //     for [a, b] in pairs: return a + b
        let def = ResolvedFunction::builder("f")
            .param("pairs")
            .locals(3)
            .stmt(Statement::For {
                target: Expression::list(vec![Expression::local("a", 1), Expression::local("b", 2)]),
                collection: Expression::local("pairs", 0),
                body: vec![Statement::ret(Expression::add(
                    Expression::local("a", 1),
                    Expression::local("b", 2),
                ))],
            })
            .build();
        let ok = Value::list(vec![Value::list(vec![Value::Int(4), Value::Int(5)])]);
        assert_eq!(run(Arc::clone(&def), vec![ok]), Ok(Value::Int(9)));

        let bad = Value::list(vec![Value::list(vec![Value::Int(4)])]);
        assert_eq!(
            run(def, vec![bad]),
            Err(EvalError::UnpackMismatch { expected: 2, got: 1 })
        );
    }

    #[test]
    fn test_unbound_local() {
        let def = ResolvedFunction::builder("f")
            .locals(1)
            .stmt(Statement::ret(Expression::local("x", 0)))
            .build();
        assert_eq!(run(def, vec![]), Err(EvalError::UnboundLocal("x".into())));
    }

    #[test]
    fn test_keyword_arguments() {
        // def f():
        //     def g(a, b): return a - b
        //     return g(b=2, a=10)
        let g = ResolvedFunction::builder("g")
            .param("a")
            .param("b")
            .stmt(Statement::ret(Expression::binary(
                BinaryOp::Minus,
                Expression::local("a", 0),
                Expression::local("b", 1),
            )))
            .build();
        let def = ResolvedFunction::builder("f")
            .locals(1)
            .stmt(Statement::def(Identifier::local("g", 0), g))
            .stmt(Statement::ret(Expression::call_with(
                Expression::local("g", 0),
                vec![
                    Argument::Keyword { name: Arc::from("b"), value: Expression::int(2) },
                    Argument::Keyword { name: Arc::from("a"), value: Expression::int(10) },
                ],
            )))
            .build();
        assert_eq!(run(def, vec![]), Ok(Value::Int(8)));
    }

    #[test]
    fn test_print_goes_to_handler() {
        let out = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&out);
        let thread = Thread::new().with_print_handler(Arc::new(move |s: &str| sink.lock().push(s.to_string())));

        let def = ResolvedFunction::builder("f")
            .stmt(Statement::expr(Expression::call(
                Expression::universal("print"),
                vec![Expression::string("hi"), Expression::int(3)],
            )))
            .build();
        let f = Value::Function(Callable::new(def, Arc::new(Interpreter)));
        assert_eq!(runtime::invoke(&thread, &f, Args::new(), Kwargs::new()), Ok(Value::None));
        assert_eq!(*out.lock(), vec!["hi 3".to_string()]);
    }
}
