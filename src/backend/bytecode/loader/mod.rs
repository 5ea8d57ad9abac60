//! Dynamic loader
//!
//! Turns a [`LoweredFunction`] into a [`LoadedUnit`]: the unit is named,
//! verified and only then made callable. A unit that fails verification is
//! never returned, so the executor only ever sees well-formed code.
//!
//! Names follow `<function name>#<function id>.<sequence>`. The sequence
//! number counts every load attempt of the loader, so loading the same
//! function again (or a different function with the same name) always yields
//! a fresh name without keeping any per-function state.

mod bridge;
mod verify;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error};

use super::chunk::CompiledUnit;
use super::compiler::LoweredFunction;
use super::function_table::FunctionTable;
use super::vm;
use crate::backend::error::{EvalResult, SpecializeError, SpecializeResult};
use crate::backend::models::{Frame, Value};

pub use bridge::SpecializedCode;
pub use verify::{verify, VerifySummary};

/// A verified unit ready to run
#[derive(Debug)]
pub struct LoadedUnit {
    name: String,
    unit: CompiledUnit,
    functions: FunctionTable,
    summary: VerifySummary,
}

impl LoadedUnit {
    /// Unique loader name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &CompiledUnit {
        &self.unit
    }

    /// Nested definitions the unit can materialize
    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn summary(&self) -> VerifySummary {
        self.summary
    }

    /// Run one call of the unit in `frame`
    #[inline]
    pub fn call(&self, frame: &mut Frame<'_>) -> EvalResult<Value> {
        vm::execute(&self.unit, &self.functions, self.summary.max_stack, frame)
    }
}

/// Names, verifies and loads compiled units
#[derive(Debug, Default)]
pub struct UnitLoader {
    sequence: AtomicU64,
    log_disassembly: bool,
    loaded: AtomicU64,
    rejected: AtomicU64,
}

impl UnitLoader {
    pub fn new(log_disassembly: bool) -> Self {
        Self {
            log_disassembly,
            ..Self::default()
        }
    }

    /// Verify and load a lowered function
    pub fn load(&self, lowered: LoweredFunction) -> SpecializeResult<Arc<LoadedUnit>> {
        let LoweredFunction { unit, functions } = lowered;
        let name = self.next_name(&unit);

        let summary = match verify(&name, &unit, &functions) {
            Ok(summary) => summary,
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                error!(target: "hotpath::loader", unit = %name, offset = e.offset, reason = %e.message, "unit failed verification");
                return Err(SpecializeError::ArtifactVerification(e));
            }
        };

        self.loaded.fetch_add(1, Ordering::Relaxed);
        debug!(
            target: "hotpath::loader",
            unit = %name,
            bytes = unit.len(),
            instructions = summary.instructions,
            max_stack = summary.max_stack,
            nested = functions.len(),
            "unit loaded"
        );
        if self.log_disassembly {
            debug!(target: "hotpath::loader::disasm", "\n{}", unit.disassemble());
        }

        Ok(Arc::new(LoadedUnit {
            name,
            unit,
            functions,
            summary,
        }))
    }

    /// Units loaded so far
    pub fn loaded_count(&self) -> u64 {
        self.loaded.load(Ordering::Relaxed)
    }

    /// Units rejected by verification so far
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    fn next_name(&self, unit: &CompiledUnit) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{}#{}.{}", sanitize(unit.name()), unit.function(), sequence)
    }
}

/// Keep identifier characters, replace the rest with `_`
fn sanitize(name: &str) -> String {
    if name.is_empty() {
        return "anonymous".to_string();
    }
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::bytecode::compiler::compile;
    use crate::backend::bytecode::opcodes::Opcode;
    use crate::backend::eval::Interpreter;
    use crate::backend::models::{Callable, Thread};
    use crate::backend::syntax::{Expression, ResolvedFunction, Statement};

    fn sum_def(name: &str) -> Arc<ResolvedFunction> {
        ResolvedFunction::builder(name)
            .stmt(Statement::ret(Expression::add(Expression::int(1), Expression::int(2))))
            .build()
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("f"), "f");
        assert_eq!(sanitize("<lambda>"), "_lambda_");
        assert_eq!(sanitize("a.b c"), "a_b_c");
        assert_eq!(sanitize(""), "anonymous");
    }

    #[test]
    fn test_names_are_unique_per_load() {
        let loader = UnitLoader::new(false);
        let f = sum_def("f");
        let other_f = sum_def("f");

        let first = loader.load(compile(&f).unwrap()).unwrap();
        let second = loader.load(compile(&f).unwrap()).unwrap();
        let third = loader.load(compile(&other_f).unwrap()).unwrap();

        assert_eq!(first.name(), format!("f#{}.0", f.id()));
        assert_eq!(second.name(), format!("f#{}.1", f.id()));
        assert_eq!(third.name(), format!("f#{}.2", other_f.id()));
        assert_ne!(first.name(), third.name());
        assert_eq!(loader.loaded_count(), 3);
    }

    #[test]
    fn test_loaded_unit_runs() {
        let loader = UnitLoader::new(true);
        let f = sum_def("f");
        let loaded = loader.load(compile(&f).unwrap()).unwrap();

        let thread = Thread::new();
        let mut frame = Frame::new(Callable::new(Arc::clone(&f), Arc::new(Interpreter)), &thread);
        assert_eq!(loaded.call(&mut frame), Ok(Value::Int(3)));
        assert_eq!(loaded.summary().max_stack, 2);
    }

    #[test]
    fn test_rejected_unit_is_not_loaded() {
        let loader = UnitLoader::new(false);
        let f = sum_def("broken");
        let mut builder = CompiledUnit::builder("broken", f.id());
        builder.emit(Opcode::Add);
        builder.emit(Opcode::Return);
        let lowered = LoweredFunction {
            unit: builder.build(),
            functions: FunctionTable::default(),
        };

        let err = loader.load(lowered).unwrap_err();
        assert!(err.is_internal_defect());
        match err {
            SpecializeError::ArtifactVerification(e) => {
                assert_eq!(e.unit, format!("broken#{}.0", f.id()));
                assert_eq!(e.offset, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(loader.loaded_count(), 0);
        assert_eq!(loader.rejected_count(), 1);
    }
}
