//! Runtime primitives shared by both engines
//!
//! The interpreter and the bytecode executor call into the same functions for
//! every observable operation, which is what keeps specialized and
//! interpreted execution indistinguishable:
//!
//! - [`bindings`]: loads and stores for the three storage scopes
//! - [`universe`]: the process-wide builtin table
//! - [`ops`]: `+` and friends, truthiness, iteration
//! - [`call`]: the dynamic call primitive

pub mod bindings;
pub mod call;
pub mod ops;
pub mod universe;

pub use call::{call_function, invoke, Args, Kwargs};
pub use ops::{add, binary, iterate, truth, ValueIter};
