//! DOM driver capability
//!
//! The engine never talks to a concrete automation backend; element
//! conditions consume this narrow trait. Embedders wire in whatever backend
//! they have, and leaving it absent is a recoverable condition failure.

use thiserror::Error;

/// One matched element; only its visible text is exposed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomElement {
    pub text: String,
}

impl DomElement {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Driver-side failures
#[derive(Debug, Error)]
pub enum DriverError {
    /// The selector could not be interpreted
    #[error("invalid selector `{0}`")]
    Selector(String),

    /// The backend failed to answer
    #[error("dom driver error: {0}")]
    Backend(String),
}

/// Capability to inspect a live page
pub trait DomDriver {
    /// All elements matching the selector, in document order
    fn find_elements(&self, selector: &str) -> Result<Vec<DomElement>, DriverError>;
}
