use serde_json::{Map, Number};

use crate::tree_walk_interpreter::{callable::Function, Value};

use super::{entry, error};

pub fn module() -> Value {
    Value::frozen_dictionary([
        entry(
            "parse",
            Function::builtin("parse", 1, |_, arguments| {
                let text = arguments[0].as_str()?;
                let json = serde_json::from_str(text)
                    .map_err(|e| error(format!("Invalid JSON: {e}")))?;
                Ok(from_json(json))
            }),
        ),
        entry(
            "stringify",
            Function::variadic_builtin("stringify", 1, |_, arguments| {
                let json = to_json(&arguments[0]);
                let indent = match arguments.get(1) {
                    None | Some(Value::Null) => 0,
                    Some(indent) => indent.as_number()?.max(0.0) as usize,
                };
                let text = if indent == 0 {
                    json.to_string()
                } else {
                    let pretty = serde_json::to_string_pretty(&json)
                        .map_err(|e| error(e.to_string()))?;
                    reindent(&pretty, indent)
                };
                Ok(Value::String(text))
            }),
        ),
    ])
}

fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::list(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(object) => Value::dictionary(
            object
                .into_iter()
                .map(|(key, value)| (key, from_json(value))),
        ),
    }
}

/// Values JSON cannot express (functions, errors, uniques and non-finite
/// numbers) become `null`.
fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Number(n) if n.fract() == 0.0 && n.abs() < 9007199254740992.0 => {
            serde_json::Value::Number(Number::from(*n as i64))
        }
        Value::Number(n) => {
            Number::from_f64(*n).map_or(serde_json::Value::Null, serde_json::Value::Number)
        }
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(list) => serde_json::Value::Array(list.items().iter().map(to_json).collect()),
        Value::Dictionary(dictionary) => serde_json::Value::Object(
            dictionary
                .pairs()
                .into_iter()
                .map(|(key, value)| (key, to_json(&value)))
                .collect::<Map<_, _>>(),
        ),
        Value::Function(_) | Value::Error(_) | Value::Unique(_) => serde_json::Value::Null,
    }
}

/// Swaps the two-space indentation of `to_string_pretty` for `width` spaces.
/// Strings never contain raw newlines in JSON output, so working line by line
/// is safe.
fn reindent(pretty: &str, width: usize) -> String {
    pretty
        .lines()
        .map(|line| {
            let content = line.trim_start_matches(' ');
            let depth = (line.len() - content.len()) / 2;
            format!("{}{}", " ".repeat(depth * width), content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_keeps_key_order() {
        let value = from_json(serde_json::from_str(r#"{"b": 1, "a": [true, null, "x"]}"#).unwrap());
        assert_eq!(value.to_string(), "{ b: 1, a: [true, null, \"x\"] }");
    }

    #[test]
    fn test_integers_stay_integers() {
        let value = Value::list(vec![Value::Number(3.0), Value::Number(0.5)]);
        assert_eq!(to_json(&value).to_string(), "[3,0.5]");
    }

    #[test]
    fn test_unrepresentable_values_become_null() {
        let value = Value::list(vec![
            Value::Number(f64::NAN),
            Value::function(Function::builtin("f", 0, |_, _| Ok(Value::Null))),
        ]);
        assert_eq!(to_json(&value).to_string(), "[null,null]");
    }

    #[test]
    fn test_reindent() {
        let pretty = "{\n  \"a\": [\n    1\n  ]\n}";
        assert_eq!(reindent(pretty, 4), "{\n    \"a\": [\n        1\n    ]\n}");
    }
}
