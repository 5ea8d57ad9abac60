//! Value creation, scoped variable access, closures and `+`.
//!
//! Loads and stores go through the binding storage functions shared with the
//! interpreter, with identifier names taken from the unit's slot tables so
//! unbound reads report the same message either way.

use std::sync::Arc;

use tracing::trace;

use crate::backend::error::EvalResult;
use crate::backend::models::{Callable, Value};
use crate::backend::runtime::{self, bindings};

use super::UnitVM;

impl UnitVM<'_, '_> {
    // === Literals ===

    pub(super) fn op_push_int_small(&mut self) -> EvalResult<()> {
        let n = self.read_i8()?;
        self.push(Value::Int(n as i64));
        Ok(())
    }

    pub(super) fn op_push_constant(&mut self) -> EvalResult<()> {
        let index = self.read_u16()?;
        let value = match self.unit.constant(index) {
            Some(value) => value.clone(),
            None => return Err(self.defect(&format!("constant #{} out of range", index))),
        };
        self.push(value);
        Ok(())
    }

    // === Variables ===

    pub(super) fn op_load_local(&mut self) -> EvalResult<()> {
        let index = self.read_u16()?;
        let value = bindings::load_local(self.frame, index, self.unit.local_name(index))?;
        self.push(value);
        Ok(())
    }

    pub(super) fn op_store_local(&mut self) -> EvalResult<()> {
        let index = self.read_u16()?;
        let value = self.pop()?;
        bindings::store_local(self.frame, index, value)
    }

    pub(super) fn op_load_global(&mut self) -> EvalResult<()> {
        let index = self.read_u16()?;
        let value = bindings::load_global(self.frame.function(), index, self.unit.global_name(index))?;
        self.push(value);
        Ok(())
    }

    pub(super) fn op_store_global(&mut self) -> EvalResult<()> {
        let index = self.read_u16()?;
        let value = self.pop()?;
        bindings::store_global(self.frame.function(), index, value);
        Ok(())
    }

    pub(super) fn op_load_universal(&mut self) -> EvalResult<()> {
        let index = self.read_u16()?;
        let value = match self.unit.universal_name(index) {
            Some(name) => bindings::load_universal(name)?,
            None => return Err(self.defect(&format!("name #{} out of range", index))),
        };
        self.push(value);
        Ok(())
    }

    // === Functions ===

    /// Materialize a fresh closure for a nested definition
    pub(super) fn op_make_function(&mut self) -> EvalResult<()> {
        let index = self.read_u16()?;
        let def = match self.unit.function_id(index).and_then(|id| self.functions.get(id)) {
            Some(def) => Arc::clone(def),
            None => return Err(self.defect(&format!("function #{} not in function table", index))),
        };
        trace!(target: "hotpath::vm::closure", unit = self.unit.name(), function = def.name(), "make function");
        let closure = Callable::new_closure(def, self.frame.function(), self.frame.thread());
        self.push(Value::Function(closure));
        Ok(())
    }

    // === Arithmetic ===

    pub(super) fn op_add(&mut self) -> EvalResult<()> {
        let b = self.pop()?;
        let a = self.pop()?;
        let sum = runtime::add(&a, &b)?;
        self.push(sum);
        Ok(())
    }
}
