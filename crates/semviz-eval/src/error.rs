//! Runtime error types for the interpreter.

use crate::Value;

/// Evaluation error raised by an action body.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Operand or argument of the wrong type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// Identifier not bound in the body's environment.
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),
    /// Field access or indexing on `nil`.
    #[error("nil access: {0}")]
    NilAccess(String),
    #[error("index out of range: {0}")]
    IndexOutOfRange(String),
    /// `assert` with a falsy condition.
    #[error("assertion failed: {0}")]
    AssertionFailed(String),
    /// `throw expr`
    #[error("{0}")]
    Thrown(Value),
    /// Unknown builtin module or function.
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    /// A builtin rejected its arguments.
    #[error("builtin error: {0}")]
    BuiltinError(String),
    #[error("gas exhausted")]
    GasExhausted,
    /// A value grew past the allocation limits.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
    /// `return` statement (used internally for control flow)
    #[error("return")]
    Return(Value),
}

/// Result alias for interpreter operations.
pub type EvalResult<T> = Result<T, EvalError>;
