//! Expression resolution against the execution context

use crate::errors::ExprError;
use crate::methods;
use crate::path::{parse_path, IndexKey, Path, Segment};
use serde_json::Value;
use stepflow_model::ExecutionContext;
use tracing::trace;

/// Outcome of resolving a pure `${path}` reference
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value(Value),
    /// The path did not lead anywhere; the caller decides how to render it
    NotFound,
}

impl Resolved {
    /// Collapse not-found into null
    pub fn into_value(self) -> Value {
        match self {
            Resolved::Value(v) => v,
            Resolved::NotFound => Value::Null,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolved::Value(_))
    }
}

/// Resolve an expression string, auto-detecting its mode.
///
/// A string that is exactly one `${path}` reference yields the referenced
/// value with its native type (null when not found). Any other string with
/// at least one reference is a template: each reference is substituted
/// textually, missing values as the empty string. A string without
/// references is returned unchanged.
pub fn resolve(expr: &str, ctx: &ExecutionContext) -> Result<Value, ExprError> {
    let refs = scan(expr)?;
    if refs.is_empty() {
        return Ok(Value::String(expr.to_string()));
    }
    if refs.len() == 1 && refs[0].start == 0 && refs[0].end == expr.len() {
        return Ok(resolve_reference(refs[0].path, ctx)?.into_value());
    }
    let mut out = String::with_capacity(expr.len());
    let mut cursor = 0;
    for reference in &refs {
        out.push_str(&expr[cursor..reference.start]);
        let resolved = resolve_reference(reference.path, ctx)?;
        out.push_str(&render(&resolved));
        cursor = reference.end;
    }
    out.push_str(&expr[cursor..]);
    Ok(Value::String(out))
}

/// Resolve a single path (the text between `${` and `}`)
pub fn resolve_reference(path_str: &str, ctx: &ExecutionContext) -> Result<Resolved, ExprError> {
    let path = parse_path(path_str)?;
    let resolved = lookup(&path, ctx);
    if !resolved.is_found() {
        trace!(path = path_str, "expression path not found");
    }
    Ok(resolved)
}

/// One `${...}` occurrence inside an expression string
struct Reference<'a> {
    /// Byte offset of the `$`
    start: usize,
    /// Byte offset just past the closing `}`
    end: usize,
    path: &'a str,
}

fn scan(expr: &str) -> Result<Vec<Reference<'_>>, ExprError> {
    let mut refs = Vec::new();
    let mut cursor = 0;
    while let Some(found) = expr[cursor..].find("${") {
        let start = cursor + found;
        let body_start = start + 2;
        match expr[body_start..].find('}') {
            Some(close) => {
                let end = body_start + close + 1;
                refs.push(Reference {
                    start,
                    end,
                    path: &expr[body_start..body_start + close],
                });
                cursor = end;
            }
            None => return Err(ExprError::Unterminated(start)),
        }
    }
    Ok(refs)
}

/// Template rendering of a resolved value
fn render(resolved: &Resolved) -> String {
    match resolved {
        Resolved::NotFound => String::new(),
        Resolved::Value(Value::Null) => String::new(),
        Resolved::Value(Value::String(s)) => s.clone(),
        Resolved::Value(Value::Number(n)) => n.to_string(),
        Resolved::Value(Value::Bool(b)) => b.to_string(),
        Resolved::Value(other) => other.to_string(),
    }
}

fn lookup(path: &Path, ctx: &ExecutionContext) -> Resolved {
    let mut iter = path.segments.iter();
    let first = match iter.next() {
        Some(segment) => segment,
        None => return Resolved::NotFound,
    };

    let mut current = if first.call.is_some() {
        // A leading method call operates on the whole context mapping
        let root = Value::Object(ctx.values().clone());
        match apply_segment(&root, first) {
            Some(v) => v,
            None => return Resolved::NotFound,
        }
    } else {
        let mut value = match ctx.get(&first.name) {
            Some(v) => v.clone(),
            None => return Resolved::NotFound,
        };
        for key in &first.indexes {
            value = match index(&value, key) {
                Some(v) => v,
                None => return Resolved::NotFound,
            };
        }
        value
    };

    for segment in iter {
        current = match apply_segment(&current, segment) {
            Some(v) => v,
            None => return Resolved::NotFound,
        };
    }
    Resolved::Value(current)
}

fn apply_segment(current: &Value, segment: &Segment) -> Option<Value> {
    let mut value = match &segment.call {
        Some(args) => methods::call(current, &segment.name, args)?,
        None => match current {
            Value::Object(map) => map.get(&segment.name)?.clone(),
            _ => return None,
        },
    };
    for key in &segment.indexes {
        value = index(&value, key)?;
    }
    Some(value)
}

fn index(value: &Value, key: &IndexKey) -> Option<Value> {
    match (value, key) {
        (Value::Array(items), IndexKey::Number(n)) => {
            let i = if *n < 0 { items.len() as i64 + n } else { *n };
            usize::try_from(i).ok().and_then(|i| items.get(i)).cloned()
        }
        (Value::Object(map), IndexKey::Key(k)) => map.get(k).cloned(),
        // A numeric index written against a mapping still works as a key
        (Value::Object(map), IndexKey::Number(n)) => map.get(&n.to_string()).cloned(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepflow_model::ExecutionContext;

    fn ctx() -> ExecutionContext {
        let seed = json!({
            "user": {"name": "John", "roles": ["admin", "dev"]},
            "items": ["a", "b", "c"],
            "count": 7,
            "flag": true,
            "rows": [{"cells": [10, 20]}, {"cells": [30]}],
        });
        ExecutionContext::from_map(seed.as_object().unwrap().clone())
    }

    #[test]
    fn pure_reference_keeps_native_type() {
        let ctx = ctx();
        assert_eq!(resolve("${user.name}", &ctx).unwrap(), json!("John"));
        assert_eq!(resolve("${count}", &ctx).unwrap(), json!(7));
        assert_eq!(resolve("${flag}", &ctx).unwrap(), json!(true));
        assert_eq!(
            resolve("${user}", &ctx).unwrap(),
            json!({"name": "John", "roles": ["admin", "dev"]})
        );
    }

    #[test]
    fn list_indexing() {
        let ctx = ctx();
        assert_eq!(resolve("${items[1]}", &ctx).unwrap(), json!("b"));
        assert_eq!(resolve("${items[-1]}", &ctx).unwrap(), json!("c"));
        assert_eq!(resolve("${rows[0].cells[1]}", &ctx).unwrap(), json!(20));
    }

    #[test]
    fn missing_path_is_null_in_reference_mode() {
        let ctx = ctx();
        assert_eq!(resolve("${missing}", &ctx).unwrap(), json!(null));
        assert_eq!(resolve("${user.missing}", &ctx).unwrap(), json!(null));
        assert_eq!(resolve("${items[9]}", &ctx).unwrap(), json!(null));
        // wrong-typed indexee
        assert_eq!(resolve("${count.name}", &ctx).unwrap(), json!(null));
    }

    #[test]
    fn template_mode_substitutes_text() {
        let ctx = ctx();
        assert_eq!(
            resolve("Hi ${user.name}!", &ctx).unwrap(),
            json!("Hi John!")
        );
        assert_eq!(
            resolve("${count} of ${items.length()}", &ctx).unwrap(),
            json!("7 of 3")
        );
        // missing values render as empty string
        assert_eq!(resolve("x=${missing}!", &ctx).unwrap(), json!("x=!"));
    }

    #[test]
    fn plain_string_passes_through() {
        let ctx = ctx();
        assert_eq!(resolve("no references", &ctx).unwrap(), json!("no references"));
    }

    #[test]
    fn method_calls() {
        let ctx = ctx();
        assert_eq!(resolve("${user.name.upper()}", &ctx).unwrap(), json!("JOHN"));
        assert_eq!(
            resolve("${user.roles.join(', ')}", &ctx).unwrap(),
            json!("admin, dev")
        );
        assert_eq!(resolve("${items.length()}", &ctx).unwrap(), json!(3));
        // unknown method resolves to not-found, not an error
        assert_eq!(resolve("${user.name.explode()}", &ctx).unwrap(), json!(null));
    }

    #[test]
    fn unterminated_reference_is_an_error() {
        let ctx = ctx();
        assert_eq!(resolve("broken ${ref", &ctx), Err(ExprError::Unterminated(7)));
    }

    #[test]
    fn template_renders_structures_as_json() {
        let ctx = ctx();
        assert_eq!(
            resolve("items: ${items}", &ctx).unwrap(),
            json!("items: [\"a\",\"b\",\"c\"]")
        );
    }
}
