//! Engine error types
//!
//! Only tree validation surfaces as a raised error; everything that happens
//! during evaluation is converted into a failure result at the boundary of
//! the failing node.

use stepflow_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The tree failed validation before execution started
    #[error(transparent)]
    Validation(#[from] ModelError),
}
