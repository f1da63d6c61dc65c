//! Condition evaluation

use crate::driver::DomDriver;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;
use stepflow_model::{
    CompareOp, Condition, ConditionKind, ConditionResult, ExecutionContext, Operand,
};
use tracing::debug;

/// Evaluates condition trees against the execution context.
///
/// Evaluation is always total: a condition either produces a definitive
/// boolean or a failure result. Failures never surface as errors.
#[derive(Clone, Default)]
pub struct ConditionEvaluator {
    dom: Option<Arc<dyn DomDriver>>,
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self { dom: None }
    }

    /// Evaluator with the DOM driver capability installed
    pub fn with_dom_driver(driver: Arc<dyn DomDriver>) -> Self {
        Self { dom: Some(driver) }
    }

    /// Evaluate a condition tree
    pub fn evaluate(&self, condition: &Condition, ctx: &ExecutionContext) -> ConditionResult {
        let result = match &condition.kind {
            ConditionKind::Comparison { left, op, right } => self.comparison(left, *op, right, ctx),
            ConditionKind::And { conditions } => self.all(conditions, ctx),
            ConditionKind::Or { conditions } => self.any(conditions, ctx),
            ConditionKind::Not { condition } => self.negate(condition, ctx),
            ConditionKind::ElementExists { selector } => self.element_exists(selector),
            ConditionKind::TextContains {
                selector,
                text,
                case_sensitive,
            } => self.text_contains(selector, text, *case_sensitive),
        };
        debug!(
            condition_id = %condition.id,
            success = result.success,
            value = result.value,
            "condition evaluated"
        );
        result
    }

    fn comparison(
        &self,
        left: &Operand,
        op: CompareOp,
        right: &Operand,
        ctx: &ExecutionContext,
    ) -> ConditionResult {
        let left = match operand_value(left, ctx) {
            Ok(v) => v,
            Err(reason) => return ConditionResult::fail(reason),
        };
        let right = match operand_value(right, ctx) {
            Ok(v) => v,
            Err(reason) => return ConditionResult::fail(reason),
        };
        match compare(op, &left, &right) {
            Ok(value) => ConditionResult::value(value),
            Err(reason) => ConditionResult::fail(reason),
        }
    }

    /// Children evaluated in order; stops at the first false
    fn all(&self, conditions: &[Condition], ctx: &ExecutionContext) -> ConditionResult {
        for condition in conditions {
            let result = self.evaluate(condition, ctx);
            if !result.success {
                return result;
            }
            if !result.value {
                return ConditionResult::value(false);
            }
        }
        ConditionResult::value(true)
    }

    /// Children evaluated in order; stops at the first true
    fn any(&self, conditions: &[Condition], ctx: &ExecutionContext) -> ConditionResult {
        for condition in conditions {
            let result = self.evaluate(condition, ctx);
            if !result.success {
                return result;
            }
            if result.value {
                return ConditionResult::value(true);
            }
        }
        ConditionResult::value(false)
    }

    /// A failed child evaluation is a failed negation; an indeterminate
    /// boolean must not become a definite one
    fn negate(&self, condition: &Condition, ctx: &ExecutionContext) -> ConditionResult {
        let result = self.evaluate(condition, ctx);
        if !result.success {
            return ConditionResult::fail(format!("not: {}", result.message));
        }
        ConditionResult::value(!result.value)
    }

    fn element_exists(&self, selector: &str) -> ConditionResult {
        let driver = match &self.dom {
            Some(driver) => driver,
            None => return ConditionResult::fail("dom driver capability is not available"),
        };
        match driver.find_elements(selector) {
            Ok(elements) => ConditionResult::value(!elements.is_empty()),
            Err(e) => ConditionResult::fail(e.to_string()),
        }
    }

    fn text_contains(&self, selector: &str, text: &str, case_sensitive: bool) -> ConditionResult {
        let driver = match &self.dom {
            Some(driver) => driver,
            None => return ConditionResult::fail("dom driver capability is not available"),
        };
        match driver.find_elements(selector) {
            Ok(elements) => {
                let needle = if case_sensitive {
                    text.to_string()
                } else {
                    text.to_lowercase()
                };
                let found = elements.iter().any(|el| {
                    if case_sensitive {
                        el.text.contains(&needle)
                    } else {
                        el.text.to_lowercase().contains(&needle)
                    }
                });
                ConditionResult::value(found)
            }
            Err(e) => ConditionResult::fail(e.to_string()),
        }
    }
}

fn operand_value(operand: &Operand, ctx: &ExecutionContext) -> Result<Value, String> {
    match operand {
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Variable(name) => ctx
            .get(name)
            .cloned()
            .ok_or_else(|| format!("variable `{name}` is not set")),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, String> {
    match op {
        CompareOp::Equal => Ok(loose_eq(left, right)),
        CompareOp::NotEqual => Ok(!loose_eq(left, right)),
        CompareOp::GreaterThan => ordering(op, left, right).map(|o| o == Ordering::Greater),
        CompareOp::GreaterOrEqual => ordering(op, left, right).map(|o| o != Ordering::Less),
        CompareOp::LessThan => ordering(op, left, right).map(|o| o == Ordering::Less),
        CompareOp::LessOrEqual => ordering(op, left, right).map(|o| o != Ordering::Greater),
        CompareOp::Contains => contains(left, right),
        CompareOp::NotContains => contains(left, right).map(|b| !b),
        CompareOp::StartsWith => match (left, right) {
            (Value::String(l), Value::String(r)) => Ok(l.starts_with(r.as_str())),
            _ => Err(mismatch(op, left, right)),
        },
        CompareOp::EndsWith => match (left, right) {
            (Value::String(l), Value::String(r)) => Ok(l.ends_with(r.as_str())),
            _ => Err(mismatch(op, left, right)),
        },
        CompareOp::MatchesRegex => match (left, right) {
            (Value::String(l), Value::String(pattern)) => Regex::new(pattern)
                .map(|re| re.is_match(l))
                .map_err(|e| format!("invalid regex `{pattern}`: {e}")),
            _ => Err(mismatch(op, left, right)),
        },
    }
}

/// Equality with numeric coercion: 10 == 10.0
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn ordering(op: CompareOp, left: &Value, right: &Value) -> Result<Ordering, String> {
    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        return l.partial_cmp(&r).ok_or_else(|| mismatch(op, left, right));
    }
    if let (Value::String(l), Value::String(r)) = (left, right) {
        return Ok(l.cmp(r));
    }
    Err(mismatch(op, left, right))
}

fn contains(left: &Value, right: &Value) -> Result<bool, String> {
    match (left, right) {
        (Value::String(haystack), Value::String(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Array(items), needle) => Ok(items.contains(needle)),
        _ => Err(mismatch(CompareOp::Contains, left, right)),
    }
}

fn mismatch(op: CompareOp, left: &Value, right: &Value) -> String {
    format!(
        "cannot apply {} to {left} and {right}",
        op.as_str()
    )
}
