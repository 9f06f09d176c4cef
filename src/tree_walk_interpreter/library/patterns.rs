use std::rc::Rc;

use regex::Regex;

use crate::{
    error::Error,
    tree_walk_interpreter::{callable::Function, Value},
};

use super::{entry, error};

/// `regex(pattern)`: compiles the pattern once and returns its methods as a
/// frozen dictionary.
pub fn constructor() -> Value {
    Value::function(Function::builtin("regex", 1, |_, arguments| {
        let source = arguments[0].as_str()?;
        let regex = Regex::new(source)
            .map_err(|e| error(format!("Invalid regular expression: {e}")))?;
        Ok(compiled(Rc::new(regex)))
    }))
}

fn compiled(regex: Rc<Regex>) -> Value {
    type Method = fn(&Regex, &[Value]) -> Result<Value, Error>;

    let method = |name: &str, arity: usize, f: Method| {
        let regex = regex.clone();
        entry(
            name,
            Function::builtin(name, arity, move |_, arguments| f(&regex, &arguments)),
        )
    };

    Value::frozen_dictionary([
        (
            "pattern".to_string(),
            Value::String(regex.as_str().to_string()),
        ),
        method("test", 1, |regex, arguments| {
            Ok(Value::Boolean(regex.is_match(arguments[0].as_str()?)))
        }),
        method("find", 1, |regex, arguments| {
            Ok(regex
                .find(arguments[0].as_str()?)
                .map_or(Value::Null, |m| string(m.as_str())))
        }),
        method("findAll", 1, |regex, arguments| {
            Ok(Value::list(
                regex
                    .find_iter(arguments[0].as_str()?)
                    .map(|m| string(m.as_str()))
                    .collect(),
            ))
        }),
        method("captures", 1, |regex, arguments| {
            let Some(captures) = regex.captures(arguments[0].as_str()?) else {
                return Ok(Value::Null);
            };
            Ok(Value::list(
                captures
                    .iter()
                    .map(|group| group.map_or(Value::Null, |m| string(m.as_str())))
                    .collect(),
            ))
        }),
        method("replace", 2, |regex, arguments| {
            let replaced = regex.replace(arguments[0].as_str()?, arguments[1].as_str()?);
            Ok(string(&replaced))
        }),
        method("replaceAll", 2, |regex, arguments| {
            let replaced = regex.replace_all(arguments[0].as_str()?, arguments[1].as_str()?);
            Ok(string(&replaced))
        }),
        method("split", 1, |regex, arguments| {
            Ok(Value::list(
                regex.split(arguments[0].as_str()?).map(string).collect(),
            ))
        }),
    ])
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}
