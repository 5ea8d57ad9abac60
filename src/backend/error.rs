//! Error types for evaluation and specialization.
//!
//! Two families are kept apart:
//! - [`EvalError`]: raised while running code. Interpreted and specialized
//!   execution raise exactly the same variants with the same messages, so a
//!   caller cannot tell which engine ran the function.
//! - [`SpecializeError`]: raised while turning a resolved function into a
//!   compiled unit. Always local to one compile attempt; the caller falls
//!   back to the interpreter.

use std::fmt;

use super::syntax::{ExpressionKind, FunctionId, StatementKind};

/// Result of evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Result of a specialization attempt
pub type SpecializeResult<T> = Result<T, SpecializeError>;

/// Errors raised while executing code
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Callee is not a function or builtin
    NotCallable { type_name: &'static str },
    /// Operand types not supported by a binary operator
    UnsupportedOperands {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    /// Integer arithmetic overflowed
    IntegerOverflow,
    /// Collection in a for loop cannot be iterated
    NotIterable { type_name: &'static str },
    /// Local slot read before any write
    UnboundLocal(String),
    /// Global slot read before any write
    UnboundGlobal(String),
    /// Universal name not present in the builtin table
    UndefinedName(String),
    /// Wrong number of positional arguments
    ArityMismatch {
        function: String,
        expected: usize,
        got: usize,
    },
    /// Keyword argument names no parameter
    UnexpectedKeyword { function: String, name: String },
    /// Parameter bound twice (positionally and by keyword)
    DuplicateArgument { function: String, name: String },
    /// Builtin does not accept keyword arguments
    KeywordsNotAccepted { function: String },
    /// Nested calls exceeded the configured depth
    CallDepthExceeded { limit: usize },
    /// Loop target is not a plain identifier or identifier list of matching size
    UnpackMismatch { expected: usize, got: usize },
    /// Parameter left without a value
    MissingArgument { function: String, name: String },
    /// Error reported by a builtin
    Builtin { function: String, message: String },
    /// Executor invariant broken or value stack limit hit
    Internal(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCallable { type_name } => {
                write!(f, "invalid call of non-function ({})", type_name)
            }
            Self::UnsupportedOperands { op, lhs, rhs } => {
                write!(f, "unsupported binary operation: {} {} {}", lhs, op, rhs)
            }
            Self::IntegerOverflow => write!(f, "integer overflow"),
            Self::NotIterable { type_name } => write!(f, "type '{}' is not iterable", type_name),
            Self::UnboundLocal(name) => {
                write!(f, "local variable '{}' referenced before assignment", name)
            }
            Self::UnboundGlobal(name) => {
                write!(f, "global variable '{}' referenced before assignment", name)
            }
            Self::UndefinedName(name) => write!(f, "name '{}' is not defined", name),
            Self::ArityMismatch { function, expected, got } => write!(
                f,
                "{}() takes {} positional argument(s) but {} were given",
                function, expected, got
            ),
            Self::UnexpectedKeyword { function, name } => {
                write!(f, "{}() got an unexpected keyword argument '{}'", function, name)
            }
            Self::DuplicateArgument { function, name } => {
                write!(f, "{}() got multiple values for parameter '{}'", function, name)
            }
            Self::KeywordsNotAccepted { function } => {
                write!(f, "{}() does not accept keyword arguments", function)
            }
            Self::CallDepthExceeded { limit } => {
                write!(f, "call depth exceeded (limit {})", limit)
            }
            Self::UnpackMismatch { expected, got } => write!(
                f,
                "too {} values to unpack (got {}, want {})",
                if got > expected { "many" } else { "few" },
                got,
                expected
            ),
            Self::MissingArgument { function, name } => {
                write!(f, "{}() missing argument for parameter '{}'", function, name)
            }
            Self::Builtin { function, message } => write!(f, "{}: {}", function, message),
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for EvalError {}

/// Construct the lowering engine cannot translate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Construct {
    Statement(StatementKind),
    Expression(ExpressionKind),
    Operator(&'static str),
    KeywordArgument(String),
    LoopTarget(ExpressionKind),
    Assignment,
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statement(kind) => write!(f, "statement {:?}", kind),
            Self::Expression(kind) => write!(f, "expression {:?}", kind),
            Self::Operator(op) => write!(f, "binary operator '{}'", op),
            Self::KeywordArgument(name) => write!(f, "keyword argument '{}'", name),
            Self::LoopTarget(kind) => write!(f, "for-loop target {:?}", kind),
            Self::Assignment => write!(f, "assignment to universal name"),
        }
    }
}

/// Structural defect found in a compiled unit before it is exposed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyError {
    /// Loader name of the unit
    pub unit: String,
    /// Byte offset of the offending instruction
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @{:04x}: {}", self.unit, self.offset, self.message)
    }
}

/// Errors raised while specializing a function
#[derive(Debug, Clone, PartialEq)]
pub enum SpecializeError {
    /// A node outside the supported subset was reached
    UnsupportedConstruct {
        function: FunctionId,
        construct: Construct,
    },
    /// The generated unit failed structural verification
    ArtifactVerification(VerifyError),
    /// Too many constants in one unit (max 65535)
    TooManyConstants,
    /// Too many distinct UNIVERSAL names in one unit (max 65535)
    TooManyNames,
    /// Too many nested definitions in one unit (max 65535)
    TooManyFunctions,
    /// Call with more than 255 positional arguments
    TooManyArguments(usize),
    /// Jump distance does not fit a 16-bit offset
    JumpTooFar,
    /// Specialization switched off by configuration
    Disabled,
}

impl SpecializeError {
    /// Whether this failure points at a defect in the lowering engine itself
    pub fn is_internal_defect(&self) -> bool {
        matches!(self, Self::ArtifactVerification(_))
    }
}

impl fmt::Display for SpecializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedConstruct { function, construct } => {
                write!(f, "unsupported construct in function #{}: {}", function, construct)
            }
            Self::ArtifactVerification(e) => write!(f, "artifact verification failed: {}", e),
            Self::TooManyConstants => write!(f, "too many constants (max 65535)"),
            Self::TooManyNames => write!(f, "too many universal names (max 65535)"),
            Self::TooManyFunctions => write!(f, "too many nested definitions (max 65535)"),
            Self::TooManyArguments(n) => write!(f, "too many call arguments: {} (max 255)", n),
            Self::JumpTooFar => write!(f, "jump offset out of range"),
            Self::Disabled => write!(f, "specialization disabled"),
        }
    }
}

impl std::error::Error for SpecializeError {}

impl From<VerifyError> for SpecializeError {
    fn from(e: VerifyError) -> Self {
        SpecializeError::ArtifactVerification(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_error_messages() {
        assert_eq!(
            EvalError::NotCallable { type_name: "int" }.to_string(),
            "invalid call of non-function (int)"
        );
        assert_eq!(
            EvalError::UnsupportedOperands { op: "+", lhs: "int", rhs: "string" }.to_string(),
            "unsupported binary operation: int + string"
        );
        assert_eq!(
            EvalError::UnboundLocal("x".into()).to_string(),
            "local variable 'x' referenced before assignment"
        );
        assert_eq!(
            EvalError::UnpackMismatch { expected: 2, got: 3 }.to_string(),
            "too many values to unpack (got 3, want 2)"
        );
    }

    #[test]
    fn test_only_verification_is_internal_defect() {
        let verify = SpecializeError::ArtifactVerification(VerifyError {
            unit: "f#1.0".into(),
            offset: 3,
            message: "stack underflow".into(),
        });
        assert!(verify.is_internal_defect());
        assert!(!SpecializeError::TooManyConstants.is_internal_defect());
        assert_eq!(
            verify.to_string(),
            "artifact verification failed: f#1.0 @0003: stack underflow"
        );
    }
}
