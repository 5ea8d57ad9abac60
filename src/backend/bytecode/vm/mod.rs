//! Bytecode executor for compiled units
//!
//! One [`UnitVM`] runs one call of a specialized function. Its value stack
//! and iterator stack live only for that call, and everything mutable it
//! touches sits in the supplied [`Frame`] or in a Callable's GLOBAL slots,
//! so any number of calls of the same unit run side by side.
//!
//! ```text
//!   CompiledUnit ──┐        ┌── value stack  (per call)
//!   FunctionTable ─┼─ UnitVM┼── iter stack   (per call)
//!   Frame ─────────┘        └── ip
//! ```
//!
//! This module is organized into submodules by functionality:
//! - `stack`: value and iterator stack helpers, immediate decoding
//! - `value_ops`: literals, scoped loads and stores, closures, `+`
//! - `control_flow`: jumps, loops, calls and returns

use std::ops::ControlFlow;

use tracing::trace;

use super::chunk::CompiledUnit;
use super::function_table::FunctionTable;
use super::opcodes::Opcode;
use crate::backend::error::{EvalError, EvalResult};
use crate::backend::models::{Frame, Value};
use crate::backend::runtime::ValueIter;

mod control_flow;
mod stack;
mod value_ops;

#[cfg(test)]
mod tests;

/// Executor state for one call of a compiled unit
pub struct UnitVM<'a, 't> {
    /// Operands and intermediate results
    pub(super) value_stack: Vec<Value>,

    /// Iterators of the enclosing FOR loops, innermost last
    pub(super) iter_stack: Vec<ValueIter>,

    /// Current instruction pointer
    pub(super) ip: usize,

    pub(super) unit: &'a CompiledUnit,

    /// Nested definitions reachable through `MakeFunction`
    pub(super) functions: &'a FunctionTable,

    /// Activation record of the call
    pub(super) frame: &'a mut Frame<'t>,

    /// Emit one trace event per instruction
    trace: bool,
}

impl<'a, 't> UnitVM<'a, 't> {
    /// `stack_capacity` presizes the value stack, normally to the depth bound
    /// computed by the verifier
    pub fn new(
        unit: &'a CompiledUnit,
        functions: &'a FunctionTable,
        stack_capacity: usize,
        frame: &'a mut Frame<'t>,
    ) -> Self {
        let trace = frame.thread().config().trace;
        Self {
            value_stack: Vec::with_capacity(stack_capacity),
            iter_stack: Vec::new(),
            ip: 0,
            unit,
            functions,
            frame,
            trace,
        }
    }

    /// Run the unit to its `Return`
    pub fn run(&mut self) -> EvalResult<Value> {
        loop {
            match self.step()? {
                ControlFlow::Continue(()) => continue,
                ControlFlow::Break(value) => return Ok(value),
            }
        }
    }

    /// Execute one instruction
    pub fn step(&mut self) -> EvalResult<ControlFlow<Value>> {
        let opcode_byte = self
            .unit
            .read_byte(self.ip)
            .ok_or_else(|| self.defect("execution fell off the end of the unit"))?;
        let opcode = Opcode::from_byte(opcode_byte)
            .ok_or_else(|| self.defect(&format!("invalid opcode 0x{:02x}", opcode_byte)))?;

        if self.trace {
            let (disasm, _) = self.unit.disassemble_instruction(self.ip);
            trace!(
                target: "hotpath::vm::step",
                unit = self.unit.name(),
                ip = self.ip,
                mnemonic = %disasm,
                stack_depth = self.value_stack.len(),
                loops = self.iter_stack.len()
            );
        }

        self.ip += 1;

        match opcode {
            // Stack
            Opcode::Pop => {
                self.pop()?;
            }

            // Values
            Opcode::PushNone => self.push(Value::None),
            Opcode::PushIntSmall => self.op_push_int_small()?,
            Opcode::PushConstant => self.op_push_constant()?,

            // Variables
            Opcode::LoadLocal => self.op_load_local()?,
            Opcode::StoreLocal => self.op_store_local()?,
            Opcode::LoadGlobal => self.op_load_global()?,
            Opcode::StoreGlobal => self.op_store_global()?,
            Opcode::LoadUniversal => self.op_load_universal()?,

            // Control flow
            Opcode::Jump => self.op_jump()?,
            Opcode::Call => self.op_call()?,
            Opcode::Return => return self.op_return(),

            // Iteration
            Opcode::GetIter => self.op_get_iter()?,
            Opcode::ForIter => self.op_for_iter()?,

            // Functions
            Opcode::MakeFunction => self.op_make_function()?,

            // Arithmetic
            Opcode::Add => self.op_add()?,
        }

        Ok(ControlFlow::Continue(()))
    }

    /// Broken executor invariant; only reachable through a verifier gap
    pub(super) fn defect(&self, message: &str) -> EvalError {
        EvalError::Internal(format!("{} @{:04x}: {}", self.unit.name(), self.ip, message))
    }
}

/// Run `unit` against `frame`
pub fn execute(
    unit: &CompiledUnit,
    functions: &FunctionTable,
    stack_capacity: usize,
    frame: &mut Frame<'_>,
) -> EvalResult<Value> {
    UnitVM::new(unit, functions, stack_capacity, frame).run()
}
