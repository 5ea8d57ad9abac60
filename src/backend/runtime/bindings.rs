//! Binding storage model
//!
//! | Scope     | Read                          | Write                         |
//! |-----------|-------------------------------|-------------------------------|
//! | Universal | builtin table, by name        | not writable                  |
//! | Global    | executing Callable's slots    | executing Callable's slots    |
//! | Local     | executing Frame's slots       | executing Frame's slots       |
//!
//! Both engines go through these functions, so unbound reads fail with the
//! same error whichever engine runs the code.

use super::universe;
use crate::backend::error::{EvalError, EvalResult};
use crate::backend::models::{Callable, Frame, Value};
use crate::backend::syntax::{Binding, Scope};

/// Read an identifier
pub fn load(frame: &Frame<'_>, binding: &Binding) -> EvalResult<Value> {
    match binding.scope {
        Scope::Universal => load_universal(&binding.name),
        Scope::Global => load_global(frame.function(), binding.index, &binding.name),
        Scope::Local => load_local(frame, binding.index, &binding.name),
    }
}

/// Write an identifier
pub fn store(frame: &mut Frame<'_>, binding: &Binding, value: Value) -> EvalResult<()> {
    match binding.scope {
        Scope::Universal => Err(EvalError::Internal(format!(
            "cannot assign universal name '{}'",
            binding.name
        ))),
        Scope::Global => {
            store_global(frame.function(), binding.index, value);
            Ok(())
        }
        Scope::Local => store_local(frame, binding.index, value),
    }
}

#[inline]
pub fn load_local(frame: &Frame<'_>, index: u16, name: &str) -> EvalResult<Value> {
    frame
        .local(index)?
        .cloned()
        .ok_or_else(|| EvalError::UnboundLocal(name.to_string()))
}

#[inline]
pub fn store_local(frame: &mut Frame<'_>, index: u16, value: Value) -> EvalResult<()> {
    frame.set_local(index, value)
}

#[inline]
pub fn load_global(function: &Callable, index: u16, name: &str) -> EvalResult<Value> {
    function
        .global(index)
        .ok_or_else(|| EvalError::UnboundGlobal(name.to_string()))
}

#[inline]
pub fn store_global(function: &Callable, index: u16, value: Value) {
    function.set_global(index, value);
}

#[inline]
pub fn load_universal(name: &str) -> EvalResult<Value> {
    universe::lookup(name).ok_or_else(|| EvalError::UndefinedName(name.to_string()))
}
