//! Function values
//!
//! A [`Callable`] is what a DEF statement produces. It pairs the resolved
//! definition with the code that runs it and owns the slot array backing
//! every GLOBAL-scope identifier in that code. The slot array is per
//! instance: two Callables made by running the same DEF twice never share
//! GLOBAL state.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::thread::{Frame, Thread};
use super::value::Value;
use crate::backend::error::EvalResult;
use crate::backend::syntax::{FunctionId, ResolvedFunction};

/// Calling interface shared by interpreted and specialized code
///
/// Call sites only ever see this trait, so they cannot tell which engine
/// runs a function. The frame arrives with parameters already bound.
pub trait FunctionCode: Send + Sync {
    fn call(&self, frame: &mut Frame<'_>) -> EvalResult<Value>;

    /// True for code produced by the specializer
    fn is_specialized(&self) -> bool {
        false
    }

    /// Short label for logs and `Debug` output
    fn describe(&self) -> String;
}

/// A function value with its own GLOBAL slot array
pub struct Callable {
    def: Arc<ResolvedFunction>,
    enclosing: Option<Arc<Callable>>,
    globals: RwLock<Vec<Option<Value>>>,
    code: Arc<dyn FunctionCode>,
}

impl Callable {
    /// Create a top-level function value
    pub fn new(def: Arc<ResolvedFunction>, code: Arc<dyn FunctionCode>) -> Arc<Self> {
        Arc::new(Self {
            def,
            enclosing: None,
            globals: RwLock::new(Vec::new()),
            code,
        })
    }

    /// Create a fresh closure for a DEF executed inside `enclosing`
    ///
    /// The code comes from the thread: specialized when the thread carries a
    /// specializer that can handle the definition, interpreted otherwise.
    pub fn new_closure(
        def: Arc<ResolvedFunction>,
        enclosing: &Arc<Callable>,
        thread: &Thread,
    ) -> Arc<Self> {
        let code = thread.code_for(&def);
        Arc::new(Self {
            def,
            enclosing: Some(Arc::clone(enclosing)),
            globals: RwLock::new(Vec::new()),
            code,
        })
    }

    #[inline]
    pub fn def(&self) -> &Arc<ResolvedFunction> {
        &self.def
    }

    #[inline]
    pub fn id(&self) -> FunctionId {
        self.def.id()
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Dotted name through the chain of enclosing functions
    pub fn qualified_name(&self) -> String {
        match &self.enclosing {
            Some(parent) => format!("{}.{}", parent.qualified_name(), self.name()),
            None => self.name().to_string(),
        }
    }

    #[inline]
    pub fn code(&self) -> &Arc<dyn FunctionCode> {
        &self.code
    }

    #[inline]
    pub fn is_specialized(&self) -> bool {
        self.code.is_specialized()
    }

    /// Read a GLOBAL slot; `None` when never written
    pub fn global(&self, index: u16) -> Option<Value> {
        self.globals.read().get(index as usize).cloned().flatten()
    }

    /// Write a GLOBAL slot, growing the array as needed
    pub fn set_global(&self, index: u16, value: Value) {
        let mut globals = self.globals.write();
        let index = index as usize;
        if globals.len() <= index {
            globals.resize(index + 1, None);
        }
        globals[index] = Some(value);
    }

    /// Number of slots allocated so far
    pub fn global_capacity(&self) -> usize {
        self.globals.read().len()
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.qualified_name())
            .field("id", &self.id())
            .field("code", &self.code.describe())
            .finish()
    }
}

/// Host function signature
pub type BuiltinFn = Arc<dyn Fn(&Thread, &[Value]) -> EvalResult<Value> + Send + Sync>;

/// A function implemented in Rust
pub struct Builtin {
    name: Arc<str>,
    func: BuiltinFn,
}

impl Builtin {
    pub fn new<F>(name: &str, func: F) -> Arc<Self>
    where
        F: Fn(&Thread, &[Value]) -> EvalResult<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: Arc::from(name),
            func: Arc::new(func),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn call(&self, thread: &Thread, args: &[Value]) -> EvalResult<Value> {
        (self.func)(thread, args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::eval::Interpreter;

    #[test]
    fn test_globals_grow_on_write() {
        let def = ResolvedFunction::builder("f").build();
        let f = Callable::new(def, Arc::new(Interpreter));
        assert_eq!(f.global(3), None);
        f.set_global(3, Value::Int(7));
        assert_eq!(f.global_capacity(), 4);
        assert_eq!(f.global(3), Some(Value::Int(7)));
        assert_eq!(f.global(0), None);
    }

    #[test]
    fn test_closures_have_independent_globals() {
        let outer = Callable::new(ResolvedFunction::builder("outer").build(), Arc::new(Interpreter));
        let inner_def = ResolvedFunction::builder("inner").build();
        let thread = Thread::new();

        let a = Callable::new_closure(Arc::clone(&inner_def), &outer, &thread);
        let b = Callable::new_closure(inner_def, &outer, &thread);
        a.set_global(0, Value::Int(1));

        assert_eq!(a.global(0), Some(Value::Int(1)));
        assert_eq!(b.global(0), None);
        assert_eq!(a.qualified_name(), "outer.inner");
    }
}
