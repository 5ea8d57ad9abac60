//! Per-function specializer
//!
//! Turns a resolved function into a compiled unit for a small stack machine
//! and runs it in place of the tree-walking interpreter. Only a narrow
//! subset of the language is specialized; anything else keeps running
//! interpreted, with identical observable behavior either way.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     ResolvedFunction (syntax)                     │
//! └───────────────────────────────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                    Lowering Engine (compiler)                     │
//! │        statements → opcodes, nested DEFs → FunctionTable          │
//! └───────────────────────────────────────────────────────────────────┘
//!                                 │  LoweredFunction
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                    Dynamic Loader (loader)                        │
//! │        unique name → verify → LoadedUnit → SpecializedCode        │
//! └───────────────────────────────────────────────────────────────────┘
//!                                 │  Arc<dyn FunctionCode>
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                    Executor (vm), one per call                    │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────────┐   │
//! │  │ Value Stack │  │ Iter Stack  │  │ Frame (LOCAL slots)      │   │
//! │  └─────────────┘  └─────────────┘  │ Callable (GLOBAL slots)  │   │
//! │                                    └──────────────────────────┘   │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`opcodes`]: instruction set
//! - [`chunk`]: [`CompiledUnit`] and its builder
//! - [`function_table`]: nested definitions reachable from a unit
//! - [`compiler`]: the lowering engine
//! - [`vm`]: executor for one call of a unit
//! - [`loader`]: naming, verification and the invocation bridge
//! - [`specializer`]: per-function cache and fallback policy
//!
//! # Example
//!
//! ```ignore
//! use hotpath::backend::bytecode::Specializer;
//! use hotpath::backend::runtime::{call_function, Args, Kwargs};
//!
//! // def f(): return 1 + 2
//! let f = ResolvedFunction::builder("f")
//!     .stmt(Statement::ret(Expression::add(Expression::int(1), Expression::int(2))))
//!     .build();
//!
//! let specializer = Specializer::default();
//! let callable = specializer.specialize(&f);
//! let result = call_function(&Thread::new(), &callable, Args::new(), Kwargs::new())?;
//! assert_eq!(result, Value::Int(3));
//! ```

pub mod chunk;
pub mod compiler;
pub mod function_table;
pub mod loader;
pub mod opcodes;
pub mod specializer;
pub mod vm;

pub use chunk::{CompiledUnit, JumpLabel, UnitBuilder};
pub use compiler::{compile, Compiler, LoweredFunction};
pub use function_table::{FunctionTable, FunctionTableBuilder};
pub use loader::{LoadedUnit, SpecializedCode, UnitLoader, VerifySummary};
pub use opcodes::Opcode;
pub use specializer::{Specializer, SpecializerStats};
pub use vm::{execute, UnitVM};
