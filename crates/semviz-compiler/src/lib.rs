//! semviz action compiler.
//!
//! ```text
//! rule shape (Grammar + Trace) → argument names ─┐
//! body text → Lexer → Parser (expression, else block) ─┴→ CompiledAction
//! ```
//!
//! A [`CompiledAction`] keeps the parsed body, the final argument names and
//! the [`ActionSource`] it was built from, so editors can reopen exactly
//! what was saved.

mod compile;
mod error;
pub mod infer;
mod source;

pub use compile::{
    compile_action, resolve_arguments, validate_arguments, ActionOutput, CompiledAction,
};
pub use error::CompileError;
pub use infer::{argument_expr, argument_signature, ArgumentInfo};
pub use source::{ActionSource, Fingerprint};
