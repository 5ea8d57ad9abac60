//! Runtime data model: values, function values, frames and threads.

pub mod callable;
pub mod thread;
pub mod value;

pub use callable::{Builtin, BuiltinFn, Callable, FunctionCode};
pub use thread::{CallGuard, Frame, PrintHandler, Thread};
pub use value::Value;
