use std::rc::Rc;

use crate::error::{Error, ErrorKind};

use super::{
    callable::Function,
    value::{format_number, repeat, Dictionary, List, MAX_STRING_LENGTH},
    Interpreter, Value,
};

impl Value {
    /// Property lookup: a dictionary's own key, then a list or string index,
    /// then the built-in table of the value's type.
    pub fn get(&self, key: &Value) -> Result<Value, ErrorKind> {
        if let (Value::Dictionary(dictionary), Value::String(_) | Value::Number(_)) = (self, key) {
            if let Some(value) = dictionary.get(&key.to_key()?) {
                return Ok(value);
            }
        }

        match (self, key) {
            (Value::List(list), Value::Number(index)) => {
                Ok(resolve_index(*index, list.len())
                    .and_then(|i| list.get(i))
                    .unwrap_or(Value::Null))
            }
            (Value::String(s), Value::Number(index)) => {
                let length = s.chars().count();
                Ok(resolve_index(*index, length)
                    .and_then(|i| s.chars().nth(i))
                    .map_or(Value::Null, |c| Value::String(c.to_string())))
            }
            (_, Value::String(name)) => property(self, name).ok_or_else(|| self.unknown(name)),
            (_, key) => Err(self.unknown(&key.to_string())),
        }
    }

    /// Clamp-and-wrap slicing of lists and strings.
    pub fn slice(&self, start: Option<f64>, end: Option<f64>) -> Result<Value, ErrorKind> {
        match self {
            Value::List(list) => {
                let (start, end) = slice_bounds(start, end, list.len());
                Ok(Value::list(list.items()[start..end].to_vec()))
            }
            Value::String(s) => {
                let (start, end) = slice_bounds(start, end, s.chars().count());
                Ok(Value::String(s.chars().skip(start).take(end - start).collect()))
            }
            other => Err(ErrorKind::UnknownProperty {
                property: "[:]".to_string(),
                type_name: other.type_name(),
            }),
        }
    }

    pub fn set(&self, key: &Value, value: Value) -> Result<(), ErrorKind> {
        match (self, key) {
            (Value::Dictionary(dictionary), key) => dictionary.set(key.to_key()?, value),
            (Value::List(list), Value::Number(index)) => {
                let length = list.len();
                let i = resolve_index(*index, length).ok_or(ErrorKind::IndexOutOfRange {
                    index: *index,
                    length,
                })?;
                list.mutate(|items| items[i] = value)
            }
            (other, key) => Err(ErrorKind::CannotSetProperty {
                property: key.to_string(),
                type_name: other.type_name(),
            }),
        }
    }

    fn unknown(&self, property: &str) -> ErrorKind {
        ErrorKind::UnknownProperty {
            property: property.to_string(),
            type_name: self.type_name(),
        }
    }
}

/// An in-range position for `index`, counting negative indices from the end.
fn resolve_index(index: f64, length: usize) -> Option<usize> {
    if index.fract() != 0.0 {
        return None;
    }
    let index = if index < 0.0 {
        length as f64 + index
    } else {
        index
    };
    (index >= 0.0 && index < length as f64).then_some(index as usize)
}

fn slice_bounds(start: Option<f64>, end: Option<f64>, length: usize) -> (usize, usize) {
    let clamp = |bound: f64| {
        let bound = if bound < 0.0 {
            length as f64 + bound
        } else {
            bound
        };
        bound.clamp(0.0, length as f64) as usize
    };

    let start = start.map_or(0, clamp);
    let end = end.map_or(length, clamp);
    (start, end.max(start))
}

fn method(
    name: &str,
    arity: usize,
    f: impl Fn(&mut Interpreter, Vec<Value>) -> Result<Value, Error> + 'static,
) -> Value {
    Value::function(Function::builtin(name, arity, f))
}

fn variadic_method(
    name: &str,
    arity: usize,
    f: impl Fn(&mut Interpreter, Vec<Value>) -> Result<Value, Error> + 'static,
) -> Value {
    Value::function(Function::variadic_builtin(name, arity, f))
}

fn argument(arguments: &[Value], i: usize) -> Value {
    arguments.get(i).cloned().unwrap_or(Value::Null)
}

/// The built-in table entry `name` for `receiver`, bound to the receiver.
fn property(receiver: &Value, name: &str) -> Option<Value> {
    if name == "toString" {
        let receiver = receiver.clone();
        return Some(method(name, 0, move |_, _| {
            Ok(Value::String(receiver.to_string()))
        }));
    }

    match receiver {
        Value::Number(n) => number_property(*n, name),
        Value::String(s) => string_property(s, name),
        Value::List(list) => list_property(list, name),
        Value::Dictionary(dictionary) => dictionary_property(dictionary, name),
        Value::Function(function) => match name {
            "name" => Some(Value::String(function.name.clone())),
            "arity" => Some(Value::Number(function.arity as f64)),
            _ => None,
        },
        Value::Error(error) => match name {
            "message" => Some(Value::String(error.message())),
            "line" => Some(Value::Number(error.line as f64)),
            _ => None,
        },
        Value::Unique(unique) => match name {
            "description" => Some(
                unique
                    .description
                    .clone()
                    .map_or(Value::Null, Value::String),
            ),
            _ => None,
        },
        Value::Null | Value::Boolean(_) => None,
    }
}

fn number_property(n: f64, name: &str) -> Option<Value> {
    let value = match name {
        "toFixed" => method(name, 1, move |_, arguments| {
            let digits = arguments[0].as_number()?;
            if !(0.0..=100.0).contains(&digits) {
                return Err(ErrorKind::Message(format!(
                    "toFixed() digits must be between 0 and 100, got {}",
                    format_number(digits)
                ))
                .into());
            }
            Ok(Value::String(format!("{:.*}", digits as usize, n)))
        }),
        "isInteger" => method(name, 0, move |_, _| {
            Ok(Value::Boolean(n.is_finite() && n.fract() == 0.0))
        }),
        "isNaN" => method(name, 0, move |_, _| Ok(Value::Boolean(n.is_nan()))),
        _ => return None,
    };
    Some(value)
}

fn string_property(s: &str, name: &str) -> Option<Value> {
    let s = s.to_string();

    let value = match name {
        "length" => Value::Number(s.chars().count() as f64),
        "toUpperCase" => method(name, 0, move |_, _| Ok(Value::String(s.to_uppercase()))),
        "toLowerCase" => method(name, 0, move |_, _| Ok(Value::String(s.to_lowercase()))),
        "trim" => method(name, 0, move |_, _| Ok(Value::String(s.trim().to_string()))),
        "trimStart" => method(name, 0, move |_, _| {
            Ok(Value::String(s.trim_start().to_string()))
        }),
        "trimEnd" => method(name, 0, move |_, _| Ok(Value::String(s.trim_end().to_string()))),
        "split" => method(name, 1, move |_, arguments| {
            let separator = arguments[0].as_str()?;
            let parts = if separator.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(separator)
                    .map(|part| Value::String(part.to_string()))
                    .collect()
            };
            Ok(Value::list(parts))
        }),
        "includes" => method(name, 1, move |_, arguments| {
            Ok(Value::Boolean(s.contains(arguments[0].as_str()?)))
        }),
        "startsWith" => method(name, 1, move |_, arguments| {
            Ok(Value::Boolean(s.starts_with(arguments[0].as_str()?)))
        }),
        "endsWith" => method(name, 1, move |_, arguments| {
            Ok(Value::Boolean(s.ends_with(arguments[0].as_str()?)))
        }),
        "indexOf" => method(name, 1, move |_, arguments| {
            let position = s
                .find(arguments[0].as_str()?)
                .map_or(-1.0, |i| s[..i].chars().count() as f64);
            Ok(Value::Number(position))
        }),
        "replace" => method(name, 2, move |_, arguments| {
            Ok(Value::String(s.replacen(
                arguments[0].as_str()?,
                arguments[1].as_str()?,
                1,
            )))
        }),
        "replaceAll" => method(name, 2, move |_, arguments| {
            Ok(Value::String(
                s.replace(arguments[0].as_str()?, arguments[1].as_str()?),
            ))
        }),
        "repeat" => method(name, 1, move |_, arguments| {
            Ok(Value::String(repeat(&s, arguments[0].as_number()?)?))
        }),
        "padStart" | "padEnd" => {
            let at_start = name == "padStart";
            variadic_method(name, 1, move |_, arguments| {
                let width = arguments[0].as_number()?;
                if width.is_nan() || width > MAX_STRING_LENGTH as f64 {
                    return Err(ErrorKind::StringTooLong {
                        limit: MAX_STRING_LENGTH,
                    }
                    .into());
                }
                let fill = match arguments.get(1) {
                    Some(fill) => fill.as_str()?.to_string(),
                    None => " ".to_string(),
                };
                Ok(Value::String(pad(&s, width.max(0.0) as usize, &fill, at_start)))
            })
        }
        "toNumber" => method(name, 0, move |_, _| {
            Ok(Value::Number(s.trim().parse().unwrap_or(f64::NAN)))
        }),
        "count" => method(name, 1, move |_, arguments| {
            let needle = arguments[0].as_str()?;
            let count = if needle.is_empty() {
                0
            } else {
                s.matches(needle).count()
            };
            Ok(Value::Number(count as f64))
        }),
        _ => return None,
    };
    Some(value)
}

fn pad(s: &str, width: usize, fill: &str, at_start: bool) -> String {
    let length = s.chars().count();
    if length >= width || fill.is_empty() {
        return s.to_string();
    }

    let padding: String = fill.chars().cycle().take(width - length).collect();
    if at_start {
        padding + s
    } else {
        s.to_string() + &padding
    }
}

/// Calls `callback` for every item with `(item, index)`, stopping early when
/// `visit` returns `Some`.
fn each(
    interpreter: &mut Interpreter,
    list: &List,
    callback: &Value,
    mut visit: impl FnMut(usize, &Value, Value) -> Option<Value>,
) -> Result<Option<Value>, Error> {
    for (i, item) in list.snapshot().into_iter().enumerate() {
        let result =
            interpreter.call_value(callback, vec![item.clone(), Value::Number(i as f64)])?;
        if let Some(found) = visit(i, &item, result) {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

fn list_property(list: &Rc<List>, name: &str) -> Option<Value> {
    let list = list.clone();

    let value = match name {
        "length" => Value::Number(list.len() as f64),
        "push" => variadic_method(name, 0, move |_, arguments| {
            list.mutate(|items| items.extend(arguments))?;
            Ok(Value::List(list.clone()))
        }),
        "pop" => method(name, 0, move |_, _| {
            Ok(list.mutate(|items| items.pop())?.unwrap_or(Value::Null))
        }),
        "map" => method(name, 1, move |interpreter, arguments| {
            let mut mapped = Vec::with_capacity(list.len());
            each(interpreter, &list, &arguments[0], |_, _, result| {
                mapped.push(result);
                None
            })?;
            Ok(Value::list(mapped))
        }),
        "filter" => method(name, 1, move |interpreter, arguments| {
            let mut kept = Vec::new();
            each(interpreter, &list, &arguments[0], |_, item, result| {
                if result.is_truthy() {
                    kept.push(item.clone());
                }
                None
            })?;
            Ok(Value::list(kept))
        }),
        "forEach" => method(name, 1, move |interpreter, arguments| {
            each(interpreter, &list, &arguments[0], |_, _, _| None)?;
            Ok(Value::Null)
        }),
        "find" => method(name, 1, move |interpreter, arguments| {
            let found = each(interpreter, &list, &arguments[0], |_, item, result| {
                result.is_truthy().then(|| item.clone())
            })?;
            Ok(found.unwrap_or(Value::Null))
        }),
        "findIndex" => method(name, 1, move |interpreter, arguments| {
            let found = each(interpreter, &list, &arguments[0], |i, _, result| {
                result.is_truthy().then_some(Value::Number(i as f64))
            })?;
            Ok(found.unwrap_or(Value::Number(-1.0)))
        }),
        "every" => method(name, 1, move |interpreter, arguments| {
            let failed = each(interpreter, &list, &arguments[0], |_, _, result| {
                (!result.is_truthy()).then_some(Value::Boolean(false))
            })?;
            Ok(Value::Boolean(failed.is_none()))
        }),
        "some" => method(name, 1, move |interpreter, arguments| {
            let passed = each(interpreter, &list, &arguments[0], |_, _, result| {
                result.is_truthy().then_some(Value::Boolean(true))
            })?;
            Ok(Value::Boolean(passed.is_some()))
        }),
        "reduce" => variadic_method(name, 1, move |interpreter, arguments| {
            let mut items = list.snapshot().into_iter().enumerate();
            let mut accumulator = match arguments.get(1) {
                Some(initial) => initial.clone(),
                None => match items.next() {
                    Some((_, first)) => first,
                    None => return Ok(Value::Null),
                },
            };
            for (i, item) in items {
                accumulator = interpreter.call_value(
                    &arguments[0],
                    vec![accumulator, item, Value::Number(i as f64)],
                )?;
            }
            Ok(accumulator)
        }),
        "includes" => method(name, 1, move |_, arguments| {
            Ok(Value::Boolean(list.items().contains(&arguments[0])))
        }),
        "indexOf" => method(name, 1, move |_, arguments| {
            let position = list
                .items()
                .iter()
                .position(|item| item == &arguments[0])
                .map_or(-1.0, |i| i as f64);
            Ok(Value::Number(position))
        }),
        "join" => variadic_method(name, 0, move |_, arguments| {
            let separator = match arguments.first() {
                Some(separator) => separator.as_str()?.to_string(),
                None => ",".to_string(),
            };
            let parts: Vec<String> = list.items().iter().map(Value::to_string).collect();
            Ok(Value::String(parts.join(&separator)))
        }),
        "reverse" => method(name, 0, move |_, _| {
            list.mutate(|items| items.reverse())?;
            Ok(Value::List(list.clone()))
        }),
        "sort" => variadic_method(name, 0, move |interpreter, arguments| {
            if list.is_frozen() {
                return Err(ErrorKind::Frozen("list").into());
            }
            let sorted = merge_sort(list.snapshot(), &mut |a, b| match arguments.first() {
                Some(compare) => {
                    let order = interpreter.call_value(compare, vec![a.clone(), b.clone()])?;
                    Ok(order.as_number()? <= 0.0)
                }
                None => Ok(a.compare(b)?.is_le()),
            })?;
            list.mutate(|items| *items = sorted)?;
            Ok(Value::List(list.clone()))
        }),
        "copy" => method(name, 0, move |_, _| Ok(Value::list(list.snapshot()))),
        "freeze" => method(name, 0, move |_, _| {
            list.freeze()?;
            Ok(Value::List(list.clone()))
        }),
        "unfreeze" => method(name, 0, move |_, _| {
            list.set_frozen(false);
            Ok(Value::List(list.clone()))
        }),
        "isFrozen" => method(name, 0, move |_, _| Ok(Value::Boolean(list.is_frozen()))),
        _ => return None,
    };
    Some(value)
}

/// Stable merge sort with a fallible `in_order(a, b)` predicate.
fn merge_sort(
    mut items: Vec<Value>,
    in_order: &mut impl FnMut(&Value, &Value) -> Result<bool, Error>,
) -> Result<Vec<Value>, Error> {
    if items.len() <= 1 {
        return Ok(items);
    }

    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, in_order)?;
    let right = merge_sort(right, in_order)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        let next = if in_order(a, b)? {
            left.next()
        } else {
            right.next()
        };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

fn dictionary_property(dictionary: &Rc<Dictionary>, name: &str) -> Option<Value> {
    let dictionary = dictionary.clone();

    let value = match name {
        "length" => Value::Number(dictionary.len() as f64),
        "keys" => method(name, 0, move |_, _| {
            Ok(Value::list(
                dictionary
                    .pairs()
                    .into_iter()
                    .map(|(key, _)| Value::String(key))
                    .collect(),
            ))
        }),
        "values" => method(name, 0, move |_, _| {
            Ok(Value::list(
                dictionary
                    .pairs()
                    .into_iter()
                    .map(|(_, value)| value)
                    .collect(),
            ))
        }),
        "entries" => method(name, 0, move |_, _| {
            Ok(Value::list(
                dictionary
                    .pairs()
                    .into_iter()
                    .map(|(key, value)| Value::list(vec![Value::String(key), value]))
                    .collect(),
            ))
        }),
        "has" => method(name, 1, move |_, arguments| {
            Ok(Value::Boolean(dictionary.has(&arguments[0].to_key()?)))
        }),
        "get" => variadic_method(name, 1, move |_, arguments| {
            Ok(dictionary
                .get(&arguments[0].to_key()?)
                .unwrap_or_else(|| argument(&arguments, 1)))
        }),
        "set" => method(name, 2, move |_, arguments| {
            let mut arguments = arguments.into_iter();
            let key = arguments.next().unwrap_or(Value::Null).to_key()?;
            dictionary.set(key, arguments.next().unwrap_or(Value::Null))?;
            Ok(Value::Dictionary(dictionary.clone()))
        }),
        "delete" => method(name, 1, move |_, arguments| {
            Ok(dictionary
                .delete(&arguments[0].to_key()?)?
                .unwrap_or(Value::Null))
        }),
        "copy" => method(name, 0, move |_, _| {
            Ok(Value::Dictionary(Rc::new(Dictionary::new(
                dictionary.snapshot(),
            ))))
        }),
        "freeze" => method(name, 0, move |_, _| {
            dictionary.freeze()?;
            Ok(Value::Dictionary(dictionary.clone()))
        }),
        "unfreeze" => method(name, 0, move |_, _| {
            dictionary.set_frozen(false);
            Ok(Value::Dictionary(dictionary.clone()))
        }),
        "isFrozen" => method(name, 0, move |_, _| {
            Ok(Value::Boolean(dictionary.is_frozen()))
        }),
        _ => return None,
    };
    Some(value)
}
