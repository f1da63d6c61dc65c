//! Field mapping for data-driven iteration

use crate::errors::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Named value transform applied while mapping a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Uppercase,
    Lowercase,
    Trim,
    ToNumber,
    ToString,
    ToBool,
}

impl Transform {
    /// Apply the transform, or explain why the value does not fit
    pub fn apply(&self, value: &Value) -> Result<Value, String> {
        match self {
            Transform::Uppercase => match value {
                Value::String(s) => Ok(Value::String(s.to_uppercase())),
                other => Err(format!("uppercase expects a string, got {other}")),
            },
            Transform::Lowercase => match value {
                Value::String(s) => Ok(Value::String(s.to_lowercase())),
                other => Err(format!("lowercase expects a string, got {other}")),
            },
            Transform::Trim => match value {
                Value::String(s) => Ok(Value::String(s.trim().to_string())),
                other => Err(format!("trim expects a string, got {other}")),
            },
            Transform::ToNumber => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::String(s) => {
                    let trimmed = s.trim();
                    if let Ok(i) = trimmed.parse::<i64>() {
                        Ok(Value::from(i))
                    } else if let Ok(f) = trimmed.parse::<f64>() {
                        serde_json::Number::from_f64(f)
                            .map(Value::Number)
                            .ok_or_else(|| format!("`{s}` is not a finite number"))
                    } else {
                        Err(format!("`{s}` is not a number"))
                    }
                }
                Value::Bool(b) => Ok(Value::from(*b as i64)),
                other => Err(format!("cannot convert {other} to a number")),
            },
            Transform::ToString => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Null => Ok(Value::String(String::new())),
                other => Ok(Value::String(other.to_string())),
            },
            Transform::ToBool => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) => match s.to_lowercase().as_str() {
                    "true" | "yes" | "1" => Ok(Value::Bool(true)),
                    "false" | "no" | "0" | "" => Ok(Value::Bool(false)),
                    _ => Err(format!("`{s}` is not a boolean")),
                },
                Value::Number(n) => Ok(Value::Bool(n.as_f64() != Some(0.0))),
                other => Err(format!("cannot convert {other} to a boolean")),
            },
        }
    }
}

/// Maps one record field into a context variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Field name read from the record
    pub source_field: String,
    /// Context variable written
    pub target_variable: String,
    /// Optional transform applied to the raw value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    /// Fallback when the field is absent or the transform fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A mapped value plus any data-quality warning raised while producing it
#[derive(Debug, Clone, PartialEq)]
pub struct MappedField {
    pub value: Value,
    pub warning: Option<String>,
}

impl FieldMapping {
    pub fn new(source_field: impl Into<String>, target_variable: impl Into<String>) -> Self {
        Self {
            source_field: source_field.into(),
            target_variable: target_variable.into(),
            transform: None,
            default: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.source_field.is_empty() {
            return Err(ModelError::EmptyMappingField {
                field: "source_field",
            });
        }
        if self.target_variable.is_empty() {
            return Err(ModelError::EmptyMappingField {
                field: "target_variable",
            });
        }
        Ok(())
    }

    fn fallback(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }

    /// Read `source_field` from the record and produce the value to assign.
    ///
    /// An absent field yields the default. A transform failure also falls
    /// back to the default, but is surfaced as a warning instead of being
    /// swallowed.
    pub fn apply(&self, record: &Map<String, Value>) -> MappedField {
        let raw = match record.get(&self.source_field) {
            Some(v) => v.clone(),
            None => {
                return MappedField {
                    value: self.fallback(),
                    warning: None,
                }
            }
        };
        match &self.transform {
            None => MappedField {
                value: raw,
                warning: None,
            },
            Some(transform) => match transform.apply(&raw) {
                Ok(value) => MappedField {
                    value,
                    warning: None,
                },
                Err(reason) => {
                    let warning = format!(
                        "transform failed for field `{}`: {reason}; using default",
                        self.source_field
                    );
                    warn!(
                        field = %self.source_field,
                        target = %self.target_variable,
                        %reason,
                        "field transform failed, falling back to default"
                    );
                    MappedField {
                        value: self.fallback(),
                        warning: Some(warning),
                    }
                }
            },
        }
    }
}
