//! Execution context and activation records
//!
//! A [`Thread`] is the per-OS-thread context handed unchanged through every
//! nested call. A [`Frame`] is created for one call and dropped when it
//! returns; it is never shared, so LOCAL writes stay private to the call.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use super::callable::{Callable, FunctionCode};
use super::value::Value;
use crate::backend::bytecode::Specializer;
use crate::backend::config::ExecConfig;
use crate::backend::error::{EvalError, EvalResult};
use crate::backend::eval::Interpreter;
use crate::backend::syntax::ResolvedFunction;

/// Sink for the `print` builtin
pub type PrintHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Execution context for one OS thread
pub struct Thread {
    config: ExecConfig,
    depth: Cell<usize>,
    specializer: Option<Arc<Specializer>>,
    print_handler: Option<PrintHandler>,
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

impl Thread {
    /// Thread with default limits that interprets every closure
    pub fn new() -> Self {
        Self::with_config(ExecConfig::default())
    }

    pub fn with_config(config: ExecConfig) -> Self {
        Self {
            config,
            depth: Cell::new(0),
            specializer: None,
            print_handler: None,
        }
    }

    /// Materialize closures through `specializer`
    pub fn with_specializer(mut self, specializer: Arc<Specializer>) -> Self {
        self.specializer = Some(specializer);
        self
    }

    /// Route `print` output to `handler` instead of stdout
    pub fn with_print_handler(mut self, handler: PrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    #[inline]
    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    #[inline]
    pub fn specializer(&self) -> Option<&Arc<Specializer>> {
        self.specializer.as_ref()
    }

    /// Current call nesting
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Code for a freshly defined function
    pub fn code_for(&self, def: &Arc<ResolvedFunction>) -> Arc<dyn FunctionCode> {
        match &self.specializer {
            Some(specializer) => specializer.code_for(def),
            None => Arc::new(Interpreter),
        }
    }

    pub fn print(&self, message: &str) {
        match &self.print_handler {
            Some(handler) => handler(message),
            None => println!("{}", message),
        }
    }

    /// Account for one more nested call; released when the guard drops
    pub fn enter_call(&self) -> EvalResult<CallGuard<'_>> {
        let depth = self.depth.get();
        if depth >= self.config.max_call_depth {
            return Err(EvalError::CallDepthExceeded {
                limit: self.config.max_call_depth,
            });
        }
        self.depth.set(depth + 1);
        Ok(CallGuard { thread: self })
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("config", &self.config)
            .field("depth", &self.depth.get())
            .field("specializing", &self.specializer.is_some())
            .finish()
    }
}

/// Depth token returned by [`Thread::enter_call`]
pub struct CallGuard<'t> {
    thread: &'t Thread,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.thread.depth.set(self.thread.depth.get() - 1);
    }
}

/// Activation record for one call
pub struct Frame<'t> {
    locals: Vec<Option<Value>>,
    function: Arc<Callable>,
    thread: &'t Thread,
}

impl<'t> Frame<'t> {
    /// Fresh frame with every local slot unbound
    pub fn new(function: Arc<Callable>, thread: &'t Thread) -> Self {
        let count = function.def().local_count() as usize;
        Self {
            locals: vec![None; count],
            function,
            thread,
        }
    }

    #[inline]
    pub fn function(&self) -> &Arc<Callable> {
        &self.function
    }

    #[inline]
    pub fn thread(&self) -> &'t Thread {
        self.thread
    }

    #[inline]
    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    /// Read a local slot; `Ok(None)` when unbound
    #[inline]
    pub fn local(&self, index: u16) -> EvalResult<Option<&Value>> {
        self.locals
            .get(index as usize)
            .map(Option::as_ref)
            .ok_or_else(|| slot_out_of_range(index, self.locals.len()))
    }

    #[inline]
    pub fn set_local(&mut self, index: u16, value: Value) -> EvalResult<()> {
        let len = self.locals.len();
        let slot = self
            .locals
            .get_mut(index as usize)
            .ok_or_else(|| slot_out_of_range(index, len))?;
        *slot = Some(value);
        Ok(())
    }
}

fn slot_out_of_range(index: u16, len: usize) -> EvalError {
    EvalError::Internal(format!("local slot {} out of range ({} slots)", index, len))
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("function", &self.function.qualified_name())
            .field("locals", &self.locals)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_depth_guard() {
        let thread = Thread::with_config(ExecConfig {
            max_call_depth: 2,
            ..ExecConfig::default()
        });
        {
            let _a = thread.enter_call().unwrap();
            let _b = thread.enter_call().unwrap();
            assert_eq!(thread.depth(), 2);
            assert_eq!(
                thread.enter_call().err(),
                Some(EvalError::CallDepthExceeded { limit: 2 })
            );
        }
        assert_eq!(thread.depth(), 0);
    }

    #[test]
    fn test_frame_locals() {
        let def = ResolvedFunction::builder("f").locals(2).build();
        let f = Callable::new(def, Arc::new(Interpreter));
        let thread = Thread::new();
        let mut frame = Frame::new(f, &thread);

        assert_eq!(frame.local(1).unwrap(), None);
        frame.set_local(1, Value::Int(5)).unwrap();
        assert_eq!(frame.local(1).unwrap(), Some(&Value::Int(5)));
        assert!(frame.local(2).is_err());
        assert!(frame.set_local(9, Value::None).is_err());
    }
}
