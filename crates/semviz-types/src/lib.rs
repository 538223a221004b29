//! Shared types for semviz.
//!
//! This crate holds everything the pipeline stages agree on: source spans
//! and structured diagnostics for action bodies, the action-language AST,
//! and the read-only trace model produced by an external grammar matcher.

pub mod ast;
mod error;
pub mod pexpr;
mod span;
pub mod trace;

pub use error::{Diagnostic, Diagnostics, ErrorCategory, ErrorCode, MAX_ERRORS};
pub use span::{SourceText, Span};
