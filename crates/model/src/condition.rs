//! Boolean condition tree

use crate::errors::ModelError;
use serde_json::Value;
use uuid::Uuid;

/// Comparison operators for leaf conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    MatchesRegex,
}

impl CompareOp {
    /// Wire tag for serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Equal => "EQUAL",
            CompareOp::NotEqual => "NOT_EQUAL",
            CompareOp::GreaterThan => "GREATER_THAN",
            CompareOp::GreaterOrEqual => "GREATER_OR_EQUAL",
            CompareOp::LessThan => "LESS_THAN",
            CompareOp::LessOrEqual => "LESS_OR_EQUAL",
            CompareOp::Contains => "CONTAINS",
            CompareOp::NotContains => "NOT_CONTAINS",
            CompareOp::StartsWith => "STARTS_WITH",
            CompareOp::EndsWith => "ENDS_WITH",
            CompareOp::MatchesRegex => "MATCHES_REGEX",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Some(match tag {
            "EQUAL" => CompareOp::Equal,
            "NOT_EQUAL" => CompareOp::NotEqual,
            "GREATER_THAN" => CompareOp::GreaterThan,
            "GREATER_OR_EQUAL" => CompareOp::GreaterOrEqual,
            "LESS_THAN" => CompareOp::LessThan,
            "LESS_OR_EQUAL" => CompareOp::LessOrEqual,
            "CONTAINS" => CompareOp::Contains,
            "NOT_CONTAINS" => CompareOp::NotContains,
            "STARTS_WITH" => CompareOp::StartsWith,
            "ENDS_WITH" => CompareOp::EndsWith,
            "MATCHES_REGEX" => CompareOp::MatchesRegex,
            _ => return None,
        })
    }
}

/// One side of a comparison: a literal value, or a `$name` context lookup.
///
/// The `$name` form is a direct key lookup, distinct from the `${...}`
/// expression grammar; an absent key is a hard evaluation failure rather
/// than a not-found null.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Variable(String),
}

impl Operand {
    /// Interpret a raw JSON value as an operand.
    ///
    /// Strings starting with a single `$` are variable references; `$$` is
    /// the escape for a literal leading dollar sign.
    pub fn from_value(value: Value) -> Self {
        if let Value::String(s) = &value {
            if let Some(rest) = s.strip_prefix("$$") {
                return Operand::Literal(Value::String(format!("${rest}")));
            }
            if let Some(name) = s.strip_prefix('$') {
                if !name.is_empty() && !name.starts_with('{') {
                    return Operand::Variable(name.to_string());
                }
            }
        }
        Operand::Literal(value)
    }

    /// Wire representation (inverse of [`Operand::from_value`])
    pub fn to_value(&self) -> Value {
        match self {
            Operand::Variable(name) => Value::String(format!("${name}")),
            Operand::Literal(Value::String(s)) if s.starts_with('$') => {
                Value::String(format!("${s}"))
            }
            Operand::Literal(v) => v.clone(),
        }
    }
}

/// A boolean-valued tree node evaluated against the execution context
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Stable node identifier
    pub id: String,
    /// Human-readable description
    pub description: String,
    /// Condition variant
    pub kind: ConditionKind,
}

/// Condition variants
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionKind {
    /// Compare two operands
    Comparison {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },

    /// All children true (short-circuits on the first false)
    And { conditions: Vec<Condition> },

    /// Any child true (short-circuits on the first true)
    Or { conditions: Vec<Condition> },

    /// Logical negation
    Not { condition: Box<Condition> },

    /// A live page has at least one element matching the selector
    ElementExists { selector: String },

    /// Some element matching the selector contains the given text
    TextContains {
        selector: String,
        text: String,
        case_sensitive: bool,
    },
}

impl Condition {
    /// Create a condition with a fresh id and no description
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            description: String::new(),
            kind,
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set an explicit id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Comparison leaf
    pub fn comparison(left: Operand, op: CompareOp, right: Operand) -> Self {
        Self::new(ConditionKind::Comparison { left, op, right })
    }

    /// AND composite; rejects an empty child list at construction time
    pub fn and(conditions: Vec<Condition>) -> Result<Self, ModelError> {
        if conditions.is_empty() {
            return Err(ModelError::EmptyComposite { kind: "and" });
        }
        Ok(Self::new(ConditionKind::And { conditions }))
    }

    /// OR composite; rejects an empty child list at construction time
    pub fn or(conditions: Vec<Condition>) -> Result<Self, ModelError> {
        if conditions.is_empty() {
            return Err(ModelError::EmptyComposite { kind: "or" });
        }
        Ok(Self::new(ConditionKind::Or { conditions }))
    }

    /// Negation
    pub fn not(condition: Condition) -> Self {
        Self::new(ConditionKind::Not {
            condition: Box::new(condition),
        })
    }

    /// Element-existence leaf
    pub fn element_exists(selector: impl Into<String>) -> Self {
        Self::new(ConditionKind::ElementExists {
            selector: selector.into(),
        })
    }

    /// Text-containment leaf
    pub fn text_contains(
        selector: impl Into<String>,
        text: impl Into<String>,
        case_sensitive: bool,
    ) -> Self {
        Self::new(ConditionKind::TextContains {
            selector: selector.into(),
            text: text.into(),
            case_sensitive,
        })
    }

    /// Validate the subtree rooted at this condition
    pub fn validate(&self) -> Result<(), ModelError> {
        match &self.kind {
            ConditionKind::Comparison { .. } => Ok(()),
            ConditionKind::And { conditions } => {
                if conditions.is_empty() {
                    return Err(ModelError::EmptyComposite { kind: "and" });
                }
                conditions.iter().try_for_each(Condition::validate)
            }
            ConditionKind::Or { conditions } => {
                if conditions.is_empty() {
                    return Err(ModelError::EmptyComposite { kind: "or" });
                }
                conditions.iter().try_for_each(Condition::validate)
            }
            ConditionKind::Not { condition } => condition.validate(),
            ConditionKind::ElementExists { selector } => {
                if selector.is_empty() {
                    return Err(ModelError::EmptySelector {
                        id: self.id.clone(),
                    });
                }
                Ok(())
            }
            ConditionKind::TextContains { selector, .. } => {
                if selector.is_empty() {
                    return Err(ModelError::EmptySelector {
                        id: self.id.clone(),
                    });
                }
                Ok(())
            }
        }
    }
}
