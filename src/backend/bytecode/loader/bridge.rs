//! Invocation bridge
//!
//! Wraps a loaded unit in the [`FunctionCode`] interface every Callable
//! carries, so call sites dispatch to specialized and interpreted code the
//! same way.

use std::sync::Arc;

use super::LoadedUnit;
use crate::backend::error::EvalResult;
use crate::backend::models::{Frame, FunctionCode, Value};

/// Specialized code for one function
#[derive(Debug, Clone)]
pub struct SpecializedCode {
    unit: Arc<LoadedUnit>,
}

impl SpecializedCode {
    pub fn new(unit: Arc<LoadedUnit>) -> Self {
        Self { unit }
    }

    pub fn unit(&self) -> &Arc<LoadedUnit> {
        &self.unit
    }
}

impl FunctionCode for SpecializedCode {
    fn call(&self, frame: &mut Frame<'_>) -> EvalResult<Value> {
        self.unit.call(frame)
    }

    fn is_specialized(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("specialized {}", self.unit.name())
    }
}
