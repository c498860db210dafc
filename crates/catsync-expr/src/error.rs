//! Expression errors, carrying enough context to point at the offending
//! config expression and source record.

use thiserror::Error;

/// Error raised while compiling or evaluating an expression.
#[derive(Debug, Error)]
pub enum ExprError {
    /// The expression does not parse.
    #[error("compiling expression `{expr}`: {message}")]
    Compile { expr: String, message: String },

    /// Evaluation failed, typically a missing field on the record.
    #[error("evaluating `{expr}` against record from {origin}: {message}")]
    Eval {
        expr: String,
        origin: String,
        message: String,
    },

    /// The expression evaluated, but to the wrong shape of value.
    #[error("`{expr}` against record from {origin}: expected {expected}, got {actual}")]
    TypeMismatch {
        expr: String,
        origin: String,
        expected: &'static str,
        actual: String,
    },
}
