//! semviz tree-walking interpreter.
//!
//! Evaluates parsed action bodies directly from the AST. There is no host
//! `eval` and no ambient scope: everything a body can see is bound
//! explicitly in its [`Environment`] before evaluation starts, and every
//! step is metered against a gas limit. Values a body builds are held to
//! the size limits in [`limits`].

pub mod builtins;
mod env;
mod error;
pub mod evaluator;
pub mod limits;
mod value;

pub use env::Environment;
pub use error::{EvalError, EvalResult};
pub use evaluator::{Interpreter, DEFAULT_GAS_LIMIT};
pub use limits::{Footprint, MAX_VALUE_BYTES, MAX_VALUE_DEPTH};
pub use value::Value;
