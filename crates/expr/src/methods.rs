//! Built-in value methods for path call suffixes
//!
//! Dispatch is by value type and method name. Anything that does not fit
//! (unknown method, wrong argument shape, wrong receiver type) returns
//! `None`, which resolution treats as not-found.

use serde_json::Value;

/// Invoke a built-in method on a value
pub fn call(value: &Value, method: &str, args: &[Value]) -> Option<Value> {
    match value {
        Value::String(s) => string_method(s, method, args),
        Value::Array(items) => list_method(items, method, args),
        Value::Object(map) => object_method(map, method, args),
        Value::Number(n) => number_method(n, method, args),
        _ => None,
    }
}

fn one_str<'a>(args: &'a [Value]) -> Option<&'a str> {
    match args {
        [Value::String(s)] => Some(s),
        _ => None,
    }
}

fn string_method(s: &str, method: &str, args: &[Value]) -> Option<Value> {
    match (method, args) {
        ("upper", []) => Some(Value::String(s.to_uppercase())),
        ("lower", []) => Some(Value::String(s.to_lowercase())),
        ("trim", []) => Some(Value::String(s.trim().to_string())),
        ("length" | "len", []) => Some(Value::from(s.chars().count())),
        ("contains", _) => one_str(args).map(|needle| Value::Bool(s.contains(needle))),
        ("starts_with", _) => one_str(args).map(|p| Value::Bool(s.starts_with(p))),
        ("ends_with", _) => one_str(args).map(|p| Value::Bool(s.ends_with(p))),
        ("replace", [Value::String(from), Value::String(to)]) => {
            Some(Value::String(s.replace(from.as_str(), to)))
        }
        ("split", _) => one_str(args).map(|sep| {
            Value::Array(
                s.split(sep)
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            )
        }),
        _ => None,
    }
}

fn list_method(items: &[Value], method: &str, args: &[Value]) -> Option<Value> {
    match (method, args) {
        ("length" | "len", []) => Some(Value::from(items.len())),
        ("first", []) => items.first().cloned(),
        ("last", []) => items.last().cloned(),
        ("get", [index]) => {
            let i = index.as_i64()?;
            let i = if i < 0 { items.len() as i64 + i } else { i };
            usize::try_from(i).ok().and_then(|i| items.get(i)).cloned()
        }
        ("join", _) => one_str(args).map(|sep| {
            let parts: Vec<String> = items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            Value::String(parts.join(sep))
        }),
        ("contains", [needle]) => Some(Value::Bool(items.contains(needle))),
        _ => None,
    }
}

fn object_method(
    map: &serde_json::Map<String, Value>,
    method: &str,
    args: &[Value],
) -> Option<Value> {
    match (method, args) {
        ("length" | "len", []) => Some(Value::from(map.len())),
        ("keys", []) => Some(Value::Array(
            map.keys().map(|k| Value::String(k.clone())).collect(),
        )),
        ("values", []) => Some(Value::Array(map.values().cloned().collect())),
        ("get", _) => one_str(args).and_then(|key| map.get(key)).cloned(),
        ("has", _) => one_str(args).map(|key| Value::Bool(map.contains_key(key))),
        _ => None,
    }
}

fn number_method(n: &serde_json::Number, method: &str, args: &[Value]) -> Option<Value> {
    match (method, args) {
        ("abs", []) => {
            if let Some(i) = n.as_i64() {
                Some(Value::from(i.abs()))
            } else {
                n.as_f64()
                    .and_then(|f| serde_json::Number::from_f64(f.abs()))
                    .map(Value::Number)
            }
        }
        ("round", []) => {
            if n.is_i64() || n.is_u64() {
                Some(Value::Number(n.clone()))
            } else {
                n.as_f64().map(|f| Value::from(f.round() as i64))
            }
        }
        ("plus", [rhs]) => arithmetic(n, rhs, false),
        ("minus", [rhs]) => arithmetic(n, rhs, true),
        _ => None,
    }
}

/// Integer arithmetic when both sides are integers, float otherwise
fn arithmetic(n: &serde_json::Number, rhs: &Value, subtract: bool) -> Option<Value> {
    if let (Some(a), Some(b)) = (n.as_i64(), rhs.as_i64()) {
        let result = if subtract {
            a.checked_sub(b)
        } else {
            a.checked_add(b)
        };
        if let Some(result) = result {
            return Some(Value::from(result));
        }
    }
    let a = n.as_f64()?;
    let b = rhs.as_f64()?;
    let result = if subtract { a - b } else { a + b };
    serde_json::Number::from_f64(result).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_methods() {
        assert_eq!(call(&json!("Hi"), "upper", &[]), Some(json!("HI")));
        assert_eq!(call(&json!("  x "), "trim", &[]), Some(json!("x")));
        assert_eq!(call(&json!("abc"), "length", &[]), Some(json!(3)));
        assert_eq!(
            call(&json!("hello"), "starts_with", &[json!("he")]),
            Some(json!(true))
        );
        assert_eq!(
            call(&json!("a,b"), "split", &[json!(",")]),
            Some(json!(["a", "b"]))
        );
    }

    #[test]
    fn list_methods() {
        let list = json!([1, 2, 3]);
        assert_eq!(call(&list, "length", &[]), Some(json!(3)));
        assert_eq!(call(&list, "first", &[]), Some(json!(1)));
        assert_eq!(call(&list, "get", &[json!(-1)]), Some(json!(3)));
        assert_eq!(
            call(&json!(["a", "b"]), "join", &[json!("-")]),
            Some(json!("a-b"))
        );
    }

    #[test]
    fn object_methods() {
        let obj = json!({"a": 1});
        assert_eq!(call(&obj, "keys", &[]), Some(json!(["a"])));
        assert_eq!(call(&obj, "has", &[json!("a")]), Some(json!(true)));
        assert_eq!(call(&obj, "get", &[json!("a")]), Some(json!(1)));
    }

    #[test]
    fn unknown_method_is_none() {
        assert_eq!(call(&json!("x"), "explode", &[]), None);
        assert_eq!(call(&json!("x"), "upper", &[json!(1)]), None);
        assert_eq!(call(&json!(true), "upper", &[]), None);
    }

    #[test]
    fn number_methods() {
        assert_eq!(call(&json!(-4), "abs", &[]), Some(json!(4)));
        assert_eq!(call(&json!(2.6), "round", &[]), Some(json!(3)));
        assert_eq!(call(&json!(4), "plus", &[json!(1)]), Some(json!(5)));
        assert_eq!(call(&json!(4), "minus", &[json!(6)]), Some(json!(-2)));
        assert_eq!(call(&json!(0.5), "plus", &[json!(1)]), Some(json!(1.5)));
    }
}
