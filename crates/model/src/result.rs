//! Evaluation result value objects

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Control-flow signal carried on an action result.
///
/// `Break` and `Continue` propagate upward through sequences and branches
/// until the nearest enclosing loop consumes them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    #[default]
    Normal,
    Break,
    Continue,
}

/// Outcome of executing one action node.
///
/// `success == false` always means the node converted an internal failure
/// into a result at its own boundary; errors never cross node boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default)]
    pub control: Control,
}

impl ActionResult {
    /// Successful result
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            payload: None,
            control: Control::Normal,
        }
    }

    /// Successful result carrying structured data
    pub fn ok_with(message: impl Into<String>, payload: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            payload: Some(payload),
            control: Control::Normal,
        }
    }

    /// Failed result
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            payload: None,
            control: Control::Normal,
        }
    }

    /// Failed result carrying structured data
    pub fn fail_with(message: impl Into<String>, payload: Value) -> Self {
        Self {
            success: false,
            message: message.into(),
            payload: Some(payload),
            control: Control::Normal,
        }
    }

    /// Successful result signalling a loop break
    pub fn break_signal() -> Self {
        Self {
            success: true,
            message: "break".into(),
            payload: None,
            control: Control::Break,
        }
    }

    /// Successful result signalling a loop continue
    pub fn continue_signal() -> Self {
        Self {
            success: true,
            message: "continue".into(),
            payload: None,
            control: Control::Continue,
        }
    }

    /// True when no control signal is active
    pub fn is_normal(&self) -> bool {
        self.control == Control::Normal
    }
}

/// Outcome of evaluating one condition node.
///
/// `success` distinguishes "evaluated to a boolean" from "could not be
/// evaluated"; callers must not treat a failed evaluation as `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionResult {
    pub success: bool,
    pub value: bool,
    pub message: String,
}

impl ConditionResult {
    /// A definitive boolean outcome
    pub fn value(value: bool) -> Self {
        Self {
            success: true,
            value,
            message: String::new(),
        }
    }

    /// Evaluation failure; the boolean value is indeterminate
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            value: false,
            message: message.into(),
        }
    }
}
