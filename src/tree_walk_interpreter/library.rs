mod file;
mod json;
mod maths;
mod patterns;

use std::{cell::RefCell, rc::Rc};

use crate::error::{Error, HostError};

use super::{
    callable::Function,
    host::{Fetch, Host, Request},
    value::Unique,
    Value,
};

/// Resolves an import name. `file` and `fetch` exist only when the host
/// supplied the matching collaborator.
pub fn resolve(name: &str, host: &Host) -> Option<Value> {
    let module = match name {
        "print" => print(host.stdout.clone()),
        "type" => Value::function(Function::builtin("type", 1, |_, arguments| {
            Ok(Value::String(arguments[0].type_name().to_string()))
        })),
        "maths" => maths::module(),
        "unique" => Value::function(Function::variadic_builtin("unique", 0, |_, arguments| {
            let description = match arguments.first() {
                None | Some(Value::Null) => None,
                Some(description) => Some(description.to_string()),
            };
            Ok(Value::Unique(Rc::new(Unique { description })))
        })),
        "json" => json::module(),
        "regex" => patterns::constructor(),
        "file" => file::module(host.file_system.clone()?),
        "fetch" => fetch(host.fetch.clone()?),
        _ => return None,
    };
    Some(module)
}

/// `print(...values)` writing to the host's output sink.
pub fn print(stdout: Rc<RefCell<dyn std::io::Write>>) -> Value {
    Value::function(Function::variadic_builtin("print", 0, move |_, arguments| {
        let line = arguments
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(stdout.borrow_mut(), "{line}").map_err(HostError::from)?;
        Ok(Value::Null)
    }))
}

fn fetch(fetch: Rc<dyn Fetch>) -> Value {
    Value::function(Function::variadic_builtin("fetch", 1, move |_, arguments| {
        let url = arguments[0].as_str()?.to_string();
        let options = match arguments.get(1) {
            Some(Value::Dictionary(options)) => Some(options.clone()),
            _ => None,
        };
        let option = |key: &str| options.as_ref().and_then(|options| options.get(key));

        let method = match option("method") {
            Some(method) => method.as_str()?.to_uppercase(),
            None => "GET".to_string(),
        };
        let body = match option("body") {
            None | Some(Value::Null) => None,
            Some(Value::String(body)) => Some(body),
            Some(other) => Some(other.to_string()),
        };
        let headers = match option("headers") {
            Some(Value::Dictionary(headers)) => headers
                .pairs()
                .into_iter()
                .map(|(name, value)| (name, value.to_string()))
                .collect(),
            _ => Vec::new(),
        };

        tracing::debug!(%url, %method, "fetch");
        let response = fetch.fetch(Request {
            url,
            method,
            body,
            headers,
        })?;

        Ok(Value::dictionary([
            ("status".to_string(), Value::Number(response.status as f64)),
            (
                "ok".to_string(),
                Value::Boolean((200..300).contains(&response.status)),
            ),
            ("body".to_string(), Value::String(response.body)),
            (
                "headers".to_string(),
                Value::dictionary(
                    response
                        .headers
                        .into_iter()
                        .map(|(name, value)| (name, Value::String(value))),
                ),
            ),
        ]))
    }))
}

fn entry(name: &str, function: Function) -> (String, Value) {
    (name.to_string(), Value::function(function))
}

fn error(message: String) -> Error {
    crate::error::ErrorKind::Message(message).into()
}
