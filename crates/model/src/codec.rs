//! Tree serialization
//!
//! Every node encodes to a `{id, type, description, ...variant fields}`
//! mapping; decoding is driven by a [`NodeRegistry`] owned by the embedding
//! application. An unknown `type` tag fails with a named error instead of
//! falling back to a default node.

use crate::action::{Action, ActionKind, Case};
use crate::condition::{CompareOp, Condition, ConditionKind, Operand};
use crate::errors::CodecError;
use crate::mapping::FieldMapping;
use crate::source::DataSourceSpec;
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Decoder for one action variant
pub type ActionDecoder = fn(&Map<String, Value>, &NodeRegistry) -> Result<ActionKind, CodecError>;

/// Decoder for one condition variant
pub type ConditionDecoder =
    fn(&Map<String, Value>, &NodeRegistry) -> Result<ConditionKind, CodecError>;

/// Explicit decoder registry, built once by the embedder and passed by
/// reference into every decode call. No global state; registration order
/// is deterministic and testable.
pub struct NodeRegistry {
    actions: HashMap<String, ActionDecoder>,
    conditions: HashMap<String, ConditionDecoder>,
}

impl NodeRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            conditions: HashMap::new(),
        }
    }

    /// Registry with every built-in action and condition variant
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_action("sequence", decode_sequence);
        registry.register_action("set_variable", decode_set_variable);
        registry.register_action("if_then_else", decode_if_then_else);
        registry.register_action("switch_case", decode_switch_case);
        registry.register_action("while_loop", decode_while_loop);
        registry.register_action("break", decode_break);
        registry.register_action("continue", decode_continue);
        registry.register_action("data_driven", decode_data_driven);
        registry.register_condition("comparison", decode_comparison);
        registry.register_condition("and", decode_and);
        registry.register_condition("or", decode_or);
        registry.register_condition("not", decode_not);
        registry.register_condition("element_exists", decode_element_exists);
        registry.register_condition("text_contains", decode_text_contains);
        registry
    }

    /// Register (or override) an action decoder for a type tag
    pub fn register_action(&mut self, tag: impl Into<String>, decoder: ActionDecoder) {
        self.actions.insert(tag.into(), decoder);
    }

    /// Register (or override) a condition decoder for a type tag
    pub fn register_condition(&mut self, tag: impl Into<String>, decoder: ConditionDecoder) {
        self.conditions.insert(tag.into(), decoder);
    }

    /// Decode an action tree and validate it
    pub fn decode_action(&self, value: &Value) -> Result<Action, CodecError> {
        let action = self.decode_action_node(value)?;
        action.validate()?;
        Ok(action)
    }

    /// Decode a condition tree and validate it
    pub fn decode_condition(&self, value: &Value) -> Result<Condition, CodecError> {
        let condition = self.decode_condition_node(value)?;
        condition.validate()?;
        Ok(condition)
    }

    fn decode_action_node(&self, value: &Value) -> Result<Action, CodecError> {
        let map = as_object(value, "action")?;
        let tag = required_str(map, "type")?;
        let decoder = self
            .actions
            .get(&tag)
            .ok_or_else(|| CodecError::UnknownType {
                kind: "action",
                tag: tag.clone(),
            })?;
        let kind = decoder(map, self)?;
        Ok(Action {
            id: node_id(map),
            description: optional_str(map, "description"),
            kind,
        })
    }

    fn decode_condition_node(&self, value: &Value) -> Result<Condition, CodecError> {
        let map = as_object(value, "condition")?;
        let tag = required_str(map, "type")?;
        let decoder = self
            .conditions
            .get(&tag)
            .ok_or_else(|| CodecError::UnknownType {
                kind: "condition",
                tag: tag.clone(),
            })?;
        let kind = decoder(map, self)?;
        Ok(Condition {
            id: node_id(map),
            description: optional_str(map, "description"),
            kind,
        })
    }

    fn decode_actions(&self, map: &Map<String, Value>, field: &'static str) -> Result<Vec<Action>, CodecError> {
        match map.get(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(|v| self.decode_action_node(v)).collect(),
            Some(_) => Err(CodecError::InvalidField {
                field,
                reason: "expected an array of actions".into(),
            }),
        }
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/* ===================== Encoding ===================== */

/// Encode an action tree to its mapping representation
pub fn encode_action(action: &Action) -> Value {
    let mut map = Map::new();
    map.insert("id".into(), Value::String(action.id.clone()));
    if !action.description.is_empty() {
        map.insert(
            "description".into(),
            Value::String(action.description.clone()),
        );
    }
    match &action.kind {
        ActionKind::Sequence { actions } => {
            map.insert("type".into(), "sequence".into());
            map.insert("actions".into(), encode_actions(actions));
        }
        ActionKind::SetVariable {
            name,
            value,
            evaluate,
        } => {
            map.insert("type".into(), "set_variable".into());
            map.insert("name".into(), Value::String(name.clone()));
            map.insert("value".into(), value.clone());
            map.insert("evaluate".into(), Value::Bool(*evaluate));
        }
        ActionKind::IfThenElse {
            condition,
            then_branch,
            else_branch,
        } => {
            map.insert("type".into(), "if_then_else".into());
            map.insert("condition".into(), encode_condition(condition));
            map.insert("then".into(), encode_actions(then_branch));
            if !else_branch.is_empty() {
                map.insert("else".into(), encode_actions(else_branch));
            }
        }
        ActionKind::SwitchCase {
            cases,
            default_branch,
        } => {
            map.insert("type".into(), "switch_case".into());
            let cases: Vec<Value> = cases
                .iter()
                .map(|case| {
                    let mut m = Map::new();
                    m.insert("condition".into(), encode_condition(&case.condition));
                    m.insert("actions".into(), encode_actions(&case.actions));
                    Value::Object(m)
                })
                .collect();
            map.insert("cases".into(), Value::Array(cases));
            if !default_branch.is_empty() {
                map.insert("default".into(), encode_actions(default_branch));
            }
        }
        ActionKind::WhileLoop {
            condition,
            body,
            max_iterations,
        } => {
            map.insert("type".into(), "while_loop".into());
            map.insert("condition".into(), encode_condition(condition));
            map.insert("body".into(), encode_actions(body));
            if let Some(max) = max_iterations {
                map.insert("max_iterations".into(), Value::from(*max));
            }
        }
        ActionKind::Break => {
            map.insert("type".into(), "break".into());
        }
        ActionKind::Continue => {
            map.insert("type".into(), "continue".into());
        }
        ActionKind::DataDriven {
            source,
            mappings,
            body,
            continue_on_error,
            max_errors,
            results_variable,
        } => {
            map.insert("type".into(), "data_driven".into());
            // DataSourceSpec and FieldMapping carry their own serde shape
            map.insert(
                "source".into(),
                serde_json::to_value(source).unwrap_or(Value::Null),
            );
            map.insert(
                "mappings".into(),
                serde_json::to_value(mappings).unwrap_or(Value::Null),
            );
            map.insert("body".into(), encode_actions(body));
            map.insert("continue_on_error".into(), Value::Bool(*continue_on_error));
            if let Some(max) = max_errors {
                map.insert("max_errors".into(), Value::from(*max));
            }
            if let Some(var) = results_variable {
                map.insert("results_variable".into(), Value::String(var.clone()));
            }
        }
    }
    Value::Object(map)
}

/// Encode a condition tree to its mapping representation
pub fn encode_condition(condition: &Condition) -> Value {
    let mut map = Map::new();
    map.insert("id".into(), Value::String(condition.id.clone()));
    if !condition.description.is_empty() {
        map.insert(
            "description".into(),
            Value::String(condition.description.clone()),
        );
    }
    match &condition.kind {
        ConditionKind::Comparison { left, op, right } => {
            map.insert("type".into(), "comparison".into());
            map.insert("left".into(), left.to_value());
            map.insert("operator".into(), op.as_str().into());
            map.insert("right".into(), right.to_value());
        }
        ConditionKind::And { conditions } => {
            map.insert("type".into(), "and".into());
            map.insert("conditions".into(), encode_conditions(conditions));
        }
        ConditionKind::Or { conditions } => {
            map.insert("type".into(), "or".into());
            map.insert("conditions".into(), encode_conditions(conditions));
        }
        ConditionKind::Not { condition } => {
            map.insert("type".into(), "not".into());
            map.insert("condition".into(), encode_condition(condition));
        }
        ConditionKind::ElementExists { selector } => {
            map.insert("type".into(), "element_exists".into());
            map.insert("selector".into(), Value::String(selector.clone()));
        }
        ConditionKind::TextContains {
            selector,
            text,
            case_sensitive,
        } => {
            map.insert("type".into(), "text_contains".into());
            map.insert("selector".into(), Value::String(selector.clone()));
            map.insert("text".into(), Value::String(text.clone()));
            map.insert("case_sensitive".into(), Value::Bool(*case_sensitive));
        }
    }
    Value::Object(map)
}

fn encode_actions(actions: &[Action]) -> Value {
    Value::Array(actions.iter().map(encode_action).collect())
}

fn encode_conditions(conditions: &[Condition]) -> Value {
    Value::Array(conditions.iter().map(encode_condition).collect())
}

/* ===================== Field helpers ===================== */

fn as_object<'a>(value: &'a Value, what: &'static str) -> Result<&'a Map<String, Value>, CodecError> {
    value.as_object().ok_or(CodecError::NotAnObject(what))
}

fn node_id(map: &Map<String, Value>) -> String {
    match map.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

fn required_str(map: &Map<String, Value>, field: &'static str) -> Result<String, CodecError> {
    map.get(field)
        .ok_or(CodecError::MissingField(field))?
        .as_str()
        .map(str::to_string)
        .ok_or(CodecError::InvalidField {
            field,
            reason: "expected a string".into(),
        })
}

fn optional_str(map: &Map<String, Value>, field: &str) -> String {
    map.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn bool_field(map: &Map<String, Value>, field: &'static str, default: bool) -> Result<bool, CodecError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(CodecError::InvalidField {
            field,
            reason: "expected a boolean".into(),
        }),
    }
}

fn optional_u64(map: &Map<String, Value>, field: &'static str) -> Result<Option<u64>, CodecError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or(CodecError::InvalidField {
            field,
            reason: "expected a non-negative integer".into(),
        }),
    }
}

fn required_condition(
    map: &Map<String, Value>,
    field: &'static str,
    registry: &NodeRegistry,
) -> Result<Condition, CodecError> {
    let value = map.get(field).ok_or(CodecError::MissingField(field))?;
    registry.decode_condition_node(value)
}

/* ===================== Action decoders ===================== */

fn decode_sequence(map: &Map<String, Value>, registry: &NodeRegistry) -> Result<ActionKind, CodecError> {
    Ok(ActionKind::Sequence {
        actions: registry.decode_actions(map, "actions")?,
    })
}

fn decode_set_variable(map: &Map<String, Value>, _: &NodeRegistry) -> Result<ActionKind, CodecError> {
    Ok(ActionKind::SetVariable {
        name: required_str(map, "name")?,
        value: map.get("value").cloned().unwrap_or(Value::Null),
        evaluate: bool_field(map, "evaluate", false)?,
    })
}

fn decode_if_then_else(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> Result<ActionKind, CodecError> {
    Ok(ActionKind::IfThenElse {
        condition: required_condition(map, "condition", registry)?,
        then_branch: registry.decode_actions(map, "then")?,
        else_branch: registry.decode_actions(map, "else")?,
    })
}

fn decode_switch_case(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> Result<ActionKind, CodecError> {
    let raw_cases = match map.get("cases") {
        None | Some(Value::Null) => &[] as &[Value],
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => {
            return Err(CodecError::InvalidField {
                field: "cases",
                reason: "expected an array of case objects".into(),
            })
        }
    };
    let mut cases = Vec::with_capacity(raw_cases.len());
    for raw in raw_cases {
        let case = as_object(raw, "case")?;
        cases.push(Case {
            condition: required_condition(case, "condition", registry)?,
            actions: registry.decode_actions(case, "actions")?,
        });
    }
    Ok(ActionKind::SwitchCase {
        cases,
        default_branch: registry.decode_actions(map, "default")?,
    })
}

fn decode_while_loop(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> Result<ActionKind, CodecError> {
    Ok(ActionKind::WhileLoop {
        condition: required_condition(map, "condition", registry)?,
        body: registry.decode_actions(map, "body")?,
        max_iterations: optional_u64(map, "max_iterations")?,
    })
}

fn decode_break(_: &Map<String, Value>, _: &NodeRegistry) -> Result<ActionKind, CodecError> {
    Ok(ActionKind::Break)
}

fn decode_continue(_: &Map<String, Value>, _: &NodeRegistry) -> Result<ActionKind, CodecError> {
    Ok(ActionKind::Continue)
}

fn decode_data_driven(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> Result<ActionKind, CodecError> {
    let source_value = map.get("source").ok_or(CodecError::MissingField("source"))?;
    let source: DataSourceSpec =
        serde_json::from_value(source_value.clone()).map_err(|e| CodecError::InvalidField {
            field: "source",
            reason: e.to_string(),
        })?;
    let mappings: Vec<FieldMapping> = match map.get("mappings") {
        None | Some(Value::Null) => Vec::new(),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| CodecError::InvalidField {
            field: "mappings",
            reason: e.to_string(),
        })?,
    };
    Ok(ActionKind::DataDriven {
        source,
        mappings,
        body: registry.decode_actions(map, "body")?,
        continue_on_error: bool_field(map, "continue_on_error", true)?,
        max_errors: optional_u64(map, "max_errors")?,
        results_variable: match map.get("results_variable") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(CodecError::InvalidField {
                    field: "results_variable",
                    reason: "expected a string".into(),
                })
            }
        },
    })
}

/* ===================== Condition decoders ===================== */

fn decode_comparison(map: &Map<String, Value>, _: &NodeRegistry) -> Result<ConditionKind, CodecError> {
    let op_tag = required_str(map, "operator")?;
    let op = CompareOp::parse(&op_tag).ok_or_else(|| CodecError::InvalidField {
        field: "operator",
        reason: format!("unknown operator `{op_tag}`"),
    })?;
    let left = map.get("left").ok_or(CodecError::MissingField("left"))?;
    let right = map.get("right").ok_or(CodecError::MissingField("right"))?;
    Ok(ConditionKind::Comparison {
        left: Operand::from_value(left.clone()),
        op,
        right: Operand::from_value(right.clone()),
    })
}

fn decode_children(
    map: &Map<String, Value>,
    registry: &NodeRegistry,
) -> Result<Vec<Condition>, CodecError> {
    match map.get("conditions") {
        None => Err(CodecError::MissingField("conditions")),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| registry.decode_condition_node(v))
            .collect(),
        Some(_) => Err(CodecError::InvalidField {
            field: "conditions",
            reason: "expected an array of conditions".into(),
        }),
    }
}

fn decode_and(map: &Map<String, Value>, registry: &NodeRegistry) -> Result<ConditionKind, CodecError> {
    let conditions = decode_children(map, registry)?;
    if conditions.is_empty() {
        return Err(CodecError::InvalidField {
            field: "conditions",
            reason: "`and` requires at least one child".into(),
        });
    }
    Ok(ConditionKind::And { conditions })
}

fn decode_or(map: &Map<String, Value>, registry: &NodeRegistry) -> Result<ConditionKind, CodecError> {
    let conditions = decode_children(map, registry)?;
    if conditions.is_empty() {
        return Err(CodecError::InvalidField {
            field: "conditions",
            reason: "`or` requires at least one child".into(),
        });
    }
    Ok(ConditionKind::Or { conditions })
}

fn decode_not(map: &Map<String, Value>, registry: &NodeRegistry) -> Result<ConditionKind, CodecError> {
    Ok(ConditionKind::Not {
        condition: Box::new(required_condition(map, "condition", registry)?),
    })
}

fn decode_element_exists(
    map: &Map<String, Value>,
    _: &NodeRegistry,
) -> Result<ConditionKind, CodecError> {
    Ok(ConditionKind::ElementExists {
        selector: required_str(map, "selector")?,
    })
}

fn decode_text_contains(
    map: &Map<String, Value>,
    _: &NodeRegistry,
) -> Result<ConditionKind, CodecError> {
    Ok(ConditionKind::TextContains {
        selector: required_str(map, "selector")?,
        text: required_str(map, "text")?,
        case_sensitive: bool_field(map, "case_sensitive", true)?,
    })
}
