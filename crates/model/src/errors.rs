//! Model error types

use thiserror::Error;

/// Tree construction and validation errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// A composite condition was built without children
    #[error("{kind} condition requires at least one child")]
    EmptyComposite { kind: &'static str },

    /// A selector string was empty
    #[error("condition {id} has an empty selector")]
    EmptySelector { id: String },

    /// A loop was capped at zero iterations
    #[error("while loop {id} has max_iterations = 0")]
    ZeroIterationCap { id: String },

    /// An error budget of zero would stop iteration before it starts
    #[error("data-driven action {id} has max_errors = 0")]
    ZeroErrorBudget { id: String },

    /// A set-variable action with an empty target name
    #[error("set-variable action {id} has an empty variable name")]
    EmptyVariableName { id: String },

    /// A field mapping with an empty source or target
    #[error("field mapping has an empty {field}")]
    EmptyMappingField { field: &'static str },
}

/// Tree serialization/deserialization errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// The `type` discriminator named a variant nobody registered
    #[error("unknown {kind} type tag `{tag}`")]
    UnknownType { kind: &'static str, tag: String },

    /// A node was not a JSON object
    #[error("expected a JSON object for {0}")]
    NotAnObject(&'static str),

    /// A required field was absent
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A field was present but malformed
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Decoded structure failed tree validation
    #[error(transparent)]
    Model(#[from] ModelError),
}
