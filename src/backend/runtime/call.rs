//! Dynamic call primitive
//!
//! Every call site in both engines ends up here. A function value is entered
//! by building a fresh [`Frame`], binding arguments to parameter slots and
//! handing the frame to the function's [`FunctionCode`](crate::backend::models::FunctionCode),
//! whichever engine that is.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;

use crate::backend::error::{EvalError, EvalResult};
use crate::backend::models::{Callable, Frame, Thread, Value};

/// Positional arguments, in evaluation order
pub type Args = SmallVec<[Value; 4]>;

/// Keyword arguments, in evaluation order
pub type Kwargs = Vec<(Arc<str>, Value)>;

/// Call `callee` with the given arguments
pub fn invoke(thread: &Thread, callee: &Value, positional: Args, keywords: Kwargs) -> EvalResult<Value> {
    match callee {
        Value::Function(function) => call_function(thread, function, positional, keywords),
        Value::Builtin(builtin) => {
            if !keywords.is_empty() {
                return Err(EvalError::KeywordsNotAccepted {
                    function: builtin.name().to_string(),
                });
            }
            let _guard = thread.enter_call()?;
            trace!(target: "hotpath::runtime::call", builtin = builtin.name(), argc = positional.len(), "call builtin");
            builtin.call(thread, &positional)
        }
        other => Err(EvalError::NotCallable {
            type_name: other.type_name(),
        }),
    }
}

/// Enter a function value
pub fn call_function(
    thread: &Thread,
    function: &Arc<Callable>,
    positional: Args,
    keywords: Kwargs,
) -> EvalResult<Value> {
    let _guard = thread.enter_call()?;
    let mut frame = bind_arguments(thread, function, positional, keywords)?;

    trace!(
        target: "hotpath::runtime::call",
        function = %function.qualified_name(),
        specialized = function.is_specialized(),
        depth = thread.depth(),
        "call function"
    );
    function.code().call(&mut frame)
}

fn bind_arguments<'t>(
    thread: &'t Thread,
    function: &Arc<Callable>,
    positional: Args,
    keywords: Kwargs,
) -> EvalResult<Frame<'t>> {
    let params = function.def().params();
    if positional.len() > params.len() {
        return Err(EvalError::ArityMismatch {
            function: function.name().to_string(),
            expected: params.len(),
            got: positional.len(),
        });
    }

    let mut frame = Frame::new(Arc::clone(function), thread);
    for (slot, value) in positional.into_iter().enumerate() {
        frame.set_local(slot as u16, value)?;
    }

    for (name, value) in keywords {
        let Some(slot) = params.iter().position(|p| *p == name) else {
            return Err(EvalError::UnexpectedKeyword {
                function: function.name().to_string(),
                name: name.to_string(),
            });
        };
        if frame.local(slot as u16)?.is_some() {
            return Err(EvalError::DuplicateArgument {
                function: function.name().to_string(),
                name: name.to_string(),
            });
        }
        frame.set_local(slot as u16, value)?;
    }

    for (slot, param) in params.iter().enumerate() {
        if frame.local(slot as u16)?.is_none() {
            return Err(EvalError::MissingArgument {
                function: function.name().to_string(),
                name: param.to_string(),
            });
        }
    }

    Ok(frame)
}
