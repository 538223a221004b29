//! Compile-time errors for action bodies.

use semviz_types::{Diagnostic, Diagnostics};

/// Why an action could not be installed. Reported while editing; never
/// stored as a node result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// The body parses neither as an expression nor as statements.
    #[error("cannot compile {rule}: {}", summary(.diagnostics))]
    Syntax {
        rule: String,
        diagnostics: Diagnostics,
    },
    /// Argument names are malformed, repeated or too many.
    #[error("invalid arguments for {rule}: {}", summary(.diagnostics))]
    Arguments {
        rule: String,
        diagnostics: Diagnostics,
    },
}

impl CompileError {
    pub fn rule(&self) -> &str {
        match self {
            CompileError::Syntax { rule, .. } | CompileError::Arguments { rule, .. } => rule,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        match self {
            CompileError::Syntax { diagnostics, .. }
            | CompileError::Arguments { diagnostics, .. } => diagnostics,
        }
    }
}

fn summary(diagnostics: &Diagnostics) -> String {
    diagnostics
        .first()
        .map(Diagnostic::to_string)
        .unwrap_or_else(|| "unknown error".to_string())
}
