//! Workflow tree model
//!
//! This crate defines the declarative workflow tree (actions and conditions),
//! the mutable execution context shared across one tree walk, the result
//! value objects produced by evaluation, and a round-trippable node codec
//! driven by an explicit type registry.

pub mod action;
pub mod codec;
pub mod condition;
pub mod context;
pub mod errors;
pub mod mapping;
pub mod result;
pub mod source;

pub use action::{Action, ActionKind, Case};
pub use codec::{encode_action, encode_condition, NodeRegistry};
pub use condition::{CompareOp, Condition, ConditionKind, Operand};
pub use context::{ExecutionContext, VariableStore};
pub use errors::{CodecError, ModelError};
pub use mapping::{FieldMapping, MappedField, Transform};
pub use result::{ActionResult, ConditionResult, Control};
pub use source::DataSourceSpec;
