//! Unit tests for the executor.

use std::sync::Arc;

use crate::backend::bytecode::chunk::CompiledUnit;
use crate::backend::bytecode::compiler::compile;
use crate::backend::bytecode::function_table::FunctionTable;
use crate::backend::bytecode::opcodes::Opcode;
use crate::backend::error::EvalError;
use crate::backend::eval::Interpreter;
use crate::backend::models::{Callable, Frame, Thread, Value};
use crate::backend::syntax::{Expression, Identifier, ResolvedFunction, Statement};

use super::execute;

/// Lower `def` and run it with `args` bound to the first local slots
fn run_lowered(thread: &Thread, def: &Arc<ResolvedFunction>, args: Vec<Value>) -> Result<Value, EvalError> {
    let lowered = compile(def).expect("lowering should succeed");
    let callable = Callable::new(Arc::clone(def), Arc::new(Interpreter));
    let mut frame = Frame::new(callable, thread);
    for (slot, value) in args.into_iter().enumerate() {
        frame.set_local(slot as u16, value)?;
    }
    execute(&lowered.unit, &lowered.functions, 0, &mut frame)
}

fn run_unit(unit: &CompiledUnit, locals: u16) -> Result<Value, EvalError> {
    let thread = Thread::new();
    let def = ResolvedFunction::builder(unit.name()).locals(locals).build();
    let mut frame = Frame::new(Callable::new(def, Arc::new(Interpreter)), &thread);
    execute(unit, &FunctionTable::default(), 0, &mut frame)
}

#[test]
fn test_return_sum() {
    let def = ResolvedFunction::builder("f")
        .stmt(Statement::ret(Expression::add(Expression::int(1), Expression::int(2))))
        .build();
    assert_eq!(run_lowered(&Thread::new(), &def, vec![]), Ok(Value::Int(3)));
}

#[test]
fn test_large_literals_and_strings() {
    let def = ResolvedFunction::builder("f")
        .stmt(Statement::ret(Expression::add(
            Expression::string("n="),
            Expression::call(Expression::universal("str"), vec![Expression::int(40_000)]),
        )))
        .build();
    assert_eq!(run_lowered(&Thread::new(), &def, vec![]), Ok(Value::string("n=40000")));
}

#[test]
fn test_for_loop_visits_each_element() {
    // def f(xs):
    //     for x in xs: print(x)
    //     return x
    let def = ResolvedFunction::builder("f")
        .param("xs")
        .locals(2)
        .stmt(Statement::for_each(
            Identifier::local("x", 1),
            Expression::local("xs", 0),
            vec![Statement::expr(Expression::call(
                Expression::universal("print"),
                vec![Expression::local("x", 1)],
            ))],
        ))
        .stmt(Statement::ret(Expression::local("x", 1)))
        .build();

    let printed = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&printed);
    let thread = Thread::new().with_print_handler(Arc::new(move |s: &str| sink.lock().push(s.to_string())));

    let xs = Value::list(vec![Value::Int(10), Value::Int(20)]);
    assert_eq!(run_lowered(&thread, &def, vec![xs]), Ok(Value::Int(20)));
    assert_eq!(*printed.lock(), vec!["10".to_string(), "20".to_string()]);
}

#[test]
fn test_empty_loop_leaves_target_unbound() {
    let def = ResolvedFunction::builder("f")
        .param("xs")
        .locals(2)
        .stmt(Statement::for_each(Identifier::local("x", 1), Expression::local("xs", 0), vec![]))
        .stmt(Statement::ret(Expression::local("x", 1)))
        .build();
    assert_eq!(
        run_lowered(&Thread::new(), &def, vec![Value::list(vec![])]),
        Err(EvalError::UnboundLocal("x".into()))
    );
}

#[test]
fn test_return_inside_nested_loops() {
    // for a in xs: for b in xs: return a + b
    let def = ResolvedFunction::builder("f")
        .param("xs")
        .locals(3)
        .stmt(Statement::for_each(
            Identifier::local("a", 1),
            Expression::local("xs", 0),
            vec![Statement::for_each(
                Identifier::local("b", 2),
                Expression::local("xs", 0),
                vec![Statement::ret(Expression::add(
                    Expression::local("a", 1),
                    Expression::local("b", 2),
                ))],
            )],
        ))
        .build();
    let xs = Value::list(vec![Value::Int(5), Value::Int(6)]);
    assert_eq!(run_lowered(&Thread::new(), &def, vec![xs]), Ok(Value::Int(10)));
}

#[test]
fn test_runtime_errors_match_interpreter_messages() {
    let not_iterable = ResolvedFunction::builder("f")
        .param("x")
        .locals(2)
        .stmt(Statement::for_each(Identifier::local("i", 1), Expression::local("x", 0), vec![]))
        .build();
    let err = run_lowered(&Thread::new(), &not_iterable, vec![Value::Int(3)]).unwrap_err();
    assert_eq!(err.to_string(), "type 'int' is not iterable");

    let bad_add = ResolvedFunction::builder("f")
        .stmt(Statement::ret(Expression::add(Expression::int(1), Expression::string("a"))))
        .build();
    let err = run_lowered(&Thread::new(), &bad_add, vec![]).unwrap_err();
    assert_eq!(err.to_string(), "unsupported binary operation: int + string");

    let not_callable = ResolvedFunction::builder("f")
        .stmt(Statement::ret(Expression::call(Expression::int(1), vec![])))
        .build();
    let err = run_lowered(&Thread::new(), &not_callable, vec![]).unwrap_err();
    assert_eq!(err.to_string(), "invalid call of non-function (int)");

    let undefined = ResolvedFunction::builder("f")
        .stmt(Statement::ret(Expression::universal("nope")))
        .build();
    assert_eq!(
        run_lowered(&Thread::new(), &undefined, vec![]),
        Err(EvalError::UndefinedName("nope".into()))
    );

    let unbound_global = ResolvedFunction::builder("f")
        .stmt(Statement::ret(Expression::global("state", 0)))
        .build();
    assert_eq!(
        run_lowered(&Thread::new(), &unbound_global, vec![]),
        Err(EvalError::UnboundGlobal("state".into()))
    );
}

#[test]
fn test_make_function_uses_table() {
    let g = ResolvedFunction::builder("g")
        .stmt(Statement::ret(Expression::int(1)))
        .build();
    let def = ResolvedFunction::builder("f")
        .locals(1)
        .stmt(Statement::def(Identifier::local("g", 0), Arc::clone(&g)))
        .stmt(Statement::ret(Expression::local("g", 0)))
        .build();
    let result = run_lowered(&Thread::new(), &def, vec![]).unwrap();
    let closure = result.as_function().expect("a function value");
    assert!(Arc::ptr_eq(closure.def(), &g));
    assert_eq!(closure.qualified_name(), "f.g");
}

#[test]
fn test_stack_capacity_does_not_bound_depth() {
    // 1 + (2 + (3 + ... + 40)) keeps 40 operands live at once
    let mut expr = Expression::int(40);
    for n in (1..40).rev() {
        expr = Expression::add(Expression::int(n), expr);
    }
    let def = ResolvedFunction::builder("f").stmt(Statement::ret(expr)).build();
    let lowered = compile(&def).expect("lowering should succeed");

    let thread = Thread::new();
    for capacity in [0, 1, 64] {
        let mut frame = Frame::new(Callable::new(Arc::clone(&def), Arc::new(Interpreter)), &thread);
        assert_eq!(
            execute(&lowered.unit, &lowered.functions, capacity, &mut frame),
            Ok(Value::Int(820))
        );
    }
}

#[test]
fn test_unverified_defects_surface_as_internal_errors() {
    // Executor never panics on a malformed unit, it reports a defect
    let mut b = CompiledUnit::builder("bad", ResolvedFunction::builder("bad").build().id());
    b.emit(Opcode::Add);
    assert!(matches!(run_unit(&b.build(), 0), Err(EvalError::Internal(_))));

    let mut b = CompiledUnit::builder("bad", ResolvedFunction::builder("bad").build().id());
    b.emit(Opcode::PushNone);
    assert!(matches!(run_unit(&b.build(), 0), Err(EvalError::Internal(_))));

    let mut b = CompiledUnit::builder("bad", ResolvedFunction::builder("bad").build().id());
    b.emit_u16(Opcode::MakeFunction, 0);
    assert!(matches!(run_unit(&b.build(), 0), Err(EvalError::Internal(_))));
}
