// Backend module for function execution and specialization
//
// This module provides the architecture where:
// - `syntax`: resolved function trees handed over by the resolver
// - `eval`: tree-walking interpreter, the reference engine and fallback
// - `bytecode`: per-function specializer (lowering, loading, executing)
// - `runtime`: storage, operators and calls shared by both engines

pub mod bytecode;
pub mod config;
pub mod error;
pub mod eval;
pub mod models;
pub mod runtime;
pub mod syntax;

pub use bytecode::{Specializer, SpecializerStats};
pub use config::{ExecConfig, SpecializerConfig};
pub use error::{Construct, EvalError, EvalResult, SpecializeError, SpecializeResult, VerifyError};
pub use eval::Interpreter;
pub use models::*;
pub use syntax::{
    Argument, BinaryOp, Binding, Expression, FunctionBuilder, FunctionId, Identifier, ResolvedFunction, Scope,
    Statement,
};
