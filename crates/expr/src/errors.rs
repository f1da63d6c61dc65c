//! Expression parse errors
//!
//! Only malformed syntax is an error; missing data resolves to not-found.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExprError {
    /// A `${` with no closing brace
    #[error("unterminated `${{` at byte {0}")]
    Unterminated(usize),

    /// An empty `${}` reference
    #[error("empty variable reference")]
    EmptyReference,

    /// Malformed path syntax
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },
}
