/// hotpath - Per-Function Runtime Specializer
///
/// This library runs resolved functions of a dynamic scripting language,
/// either through a tree-walking interpreter or through code specialized
/// for one function at a time.
///
/// # Architecture
///
/// Execution of a function goes through one of two engines:
///
/// 1. **Interpreter** (`backend::eval`)
///    - Walks the resolved statement tree directly
///    - Supports every construct the resolver produces
///    - Runs anything the specializer rejects
///
/// 2. **Specializer** (`backend::bytecode`)
///    - Lowers a narrow subset (RETURN, EXPRESSION, DEF, FOR; CALL,
///      identifiers, INT and STRING literals, `+`) into a compiled unit
///    - Verifies each unit before it is loaded
///    - Runs units on a small stack machine, one executor per call
///
/// Both engines share storage, operators and the call primitive
/// (`backend::runtime`), so a caller cannot tell which engine ran a function.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use hotpath::backend::*;
/// use hotpath::backend::runtime::{call_function, Args, Kwargs};
///
/// // def f(x): return x + 2
/// let f = ResolvedFunction::builder("f")
///     .param("x")
///     .stmt(Statement::ret(Expression::add(Expression::local("x", 0), Expression::int(2))))
///     .build();
///
/// let specializer = Arc::new(Specializer::default());
/// let thread = Thread::new().with_specializer(Arc::clone(&specializer));
/// let callable = specializer.specialize(&f);
/// assert!(callable.is_specialized());
///
/// let args: Args = [Value::Int(40)].into_iter().collect();
/// let result = call_function(&thread, &callable, args, Kwargs::new()).unwrap();
/// assert_eq!(result, Value::Int(42));
/// ```
///
/// # Storage Scopes
///
/// - **LOCAL**: per-call slots in the `Frame`, never shared between calls
/// - **GLOBAL**: slots owned by a `Callable`, shared by every call through it
/// - **UNIVERSAL**: process-wide builtin table, initialized once

pub mod backend;

pub use backend::{
    Callable, EvalError, ExecConfig, Interpreter, ResolvedFunction, SpecializeError, Specializer,
    SpecializerConfig, Thread, Value,
};
