//! Errors returned by session commands.

use semviz_compiler::CompileError;
use semviz_types::trace::{TraceError, TraceId};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("an action named '{0}' already exists")]
    DuplicateAction(String),
    #[error("'{0}' is not a valid action name")]
    InvalidActionName(String),
    #[error("no action named '{0}'")]
    UnknownAction(String),
    #[error("no action is selected")]
    NoActiveAction,
    #[error("no trace is loaded")]
    NoTrace,
    #[error("trace node {0} does not exist")]
    UnknownNode(TraceId),
    /// Actions attach to rule applications only.
    #[error("trace node {0} is not a rule application with a syntax tree")]
    NotARule(TraceId),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Trace(#[from] TraceError),
}

pub type SessionResult<T> = Result<T, SessionError>;
