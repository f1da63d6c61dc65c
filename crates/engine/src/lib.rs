//! Workflow execution engine
//!
//! Interprets a declarative action tree against a shared mutable execution
//! context: sequences, branching, switching, condition-driven loops and
//! data-driven iteration, with a condition evaluator and the expression
//! resolver underneath. Strictly single-threaded and synchronous; every
//! call runs to completion before returning.

pub mod condition;
pub mod driver;
pub mod errors;
pub mod executor;

pub use condition::ConditionEvaluator;
pub use driver::{DomDriver, DomElement, DriverError};
pub use errors::EngineError;
pub use executor::{Engine, ExecutionReport};
