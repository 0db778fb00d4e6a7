//! Global native functions and the builtin methods of lists, strings and
//! dicts.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::Utc;
use log::debug;

use crate::environment::Environment;
use crate::error::{Result, ShravError};
use crate::interpreter::Interpreter;
use crate::modules::arg;
use crate::value::{Dict, Value};

/// Names defined by [`define_globals`].
pub const GLOBALS: [&str; 6] = ["clock", "len", "str", "int", "float", "type"];

/// Populate the root scope of a fresh interpreter.
pub fn define_globals(env: &mut Environment) {
    debug!("Defining {} global natives", GLOBALS.len());

    env.define(
        "clock",
        Value::native("clock", 0, |_, _| {
            let now = Utc::now();
            let seconds: f64 =
                now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9;
            Ok(Value::Float(seconds))
        }),
    );

    env.define(
        "len",
        Value::native("len", 1, |_, args| {
            let value: Value = arg(args, 0);
            length(&value)
                .map(|n| Value::Int(n as i64))
                .ok_or_else(|| {
                    ShravError::Type(format!("len() of unsized value {}", value.type_name()))
                })
        }),
    );

    env.define(
        "str",
        Value::native("str", 1, |_, args| Ok(Value::Str(arg(args, 0).to_string()))),
    );

    env.define(
        "int",
        Value::native("int", 1, |_, args| match arg(args, 0) {
            Value::Null => Ok(Value::Int(0)),
            value => to_int(&value).map(Value::Int).ok_or_else(|| {
                ShravError::Type(format!("int() cannot convert {} '{}'", value.type_name(), value))
            }),
        }),
    );

    env.define(
        "float",
        Value::native("float", 1, |_, args| match arg(args, 0) {
            Value::Null => Ok(Value::Float(0.0)),
            value => to_float(&value).map(Value::Float).ok_or_else(|| {
                ShravError::Type(format!(
                    "float() cannot convert {} '{}'",
                    value.type_name(),
                    value
                ))
            }),
        }),
    );

    env.define(
        "type",
        Value::native("type", 1, |_, args| Ok(Value::Str(arg(args, 0).type_name()))),
    );
}

/// Element count of a string (in characters), list or dict.
pub fn length(value: &Value) -> Option<usize> {
    match value {
        Value::Str(s) => Some(s.chars().count()),
        Value::List(items) => Some(items.borrow().len()),
        Value::Dict(dict) => Some(dict.borrow().len()),
        _ => None,
    }
}

/// Integer view used by `int()` and for‑loop bounds: floats truncate toward
/// zero, bools are 0/1, strings must hold a number.
pub fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        Value::Float(n) if n.is_finite() => Some(n.trunc() as i64),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Str(s) => {
            let s: &str = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n.trunc() as i64))
        }
        _ => None,
    }
}

pub fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Str(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Builtin method `name` of a list, string or dict receiver, as a native
/// closed over the receiver.  `None` when the receiver has no such method.
pub fn method(receiver: &Value, name: &str) -> Option<Value> {
    match receiver {
        Value::List(items) => list_method(Rc::clone(items), name),
        Value::Str(s) => string_method(s.clone(), name),
        Value::Dict(dict) => dict_method(Rc::clone(dict), name),
        _ => None,
    }
}

fn list_method(items: Rc<RefCell<Vec<Value>>>, name: &str) -> Option<Value> {
    let method: Value = match name {
        "push" | "append" => Value::native(name, 1, move |_, args| {
            items.borrow_mut().push(arg(args, 0));
            Ok(Value::Null)
        }),

        "pop" => Value::native(name, 0, move |_, _| {
            items
                .borrow_mut()
                .pop()
                .ok_or_else(|| ShravError::Index("pop from empty list".into()))
        }),

        "len" => Value::native(name, 0, move |_, _| {
            Ok(Value::Int(items.borrow().len() as i64))
        }),

        "map" => Value::native(name, 1, move |interpreter: &mut Interpreter, args| {
            let function: Value = arg(args, 0);
            // Snapshot: the callback may mutate the list.
            let snapshot: Vec<Value> = items.borrow().clone();

            let mapped: Vec<Value> = snapshot
                .into_iter()
                .map(|item| interpreter.call(&function, vec![item]))
                .collect::<Result<_>>()?;

            Ok(Value::list(mapped))
        }),

        "contains" => Value::native(name, 1, move |_, args| {
            let needle: Value = arg(args, 0);
            Ok(Value::Bool(items.borrow().contains(&needle)))
        }),

        "join" => Value::native(name, 1, move |_, args| {
            let separator: String = match arg(args, 0) {
                Value::Null => String::new(),
                other => other.to_string(),
            };
            let parts: Vec<String> = items.borrow().iter().map(Value::to_string).collect();
            Ok(Value::Str(parts.join(&separator)))
        }),

        _ => return None,
    };

    Some(method)
}

fn string_method(s: String, name: &str) -> Option<Value> {
    let method: Value = match name {
        "len" => Value::native(name, 0, move |_, _| Ok(Value::Int(s.chars().count() as i64))),

        "upper" => Value::native(name, 0, move |_, _| Ok(Value::Str(s.to_uppercase()))),

        "lower" => Value::native(name, 0, move |_, _| Ok(Value::Str(s.to_lowercase()))),

        "trim" => Value::native(name, 0, move |_, _| Ok(Value::Str(s.trim().to_owned()))),

        "split" => Value::native(name, 1, move |_, args| {
            let parts: Vec<Value> = match arg(args, 0) {
                Value::Null => s.split_whitespace().map(|p| Value::Str(p.to_owned())).collect(),
                Value::Str(sep) if !sep.is_empty() => {
                    s.split(sep.as_str()).map(|p| Value::Str(p.to_owned())).collect()
                }
                other => {
                    return Err(ShravError::Type(format!(
                        "split() separator must be a non-empty string, got {}",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::list(parts))
        }),

        "contains" => Value::native(name, 1, move |_, args| match arg(args, 0) {
            Value::Str(needle) => Ok(Value::Bool(s.contains(needle.as_str()))),
            other => Err(ShravError::Type(format!(
                "contains() on a string expects a string, got {}",
                other.type_name()
            ))),
        }),

        _ => return None,
    };

    Some(method)
}

fn dict_key(function: &str, value: &Value) -> Result<String> {
    match value {
        Value::Str(key) => Ok(key.clone()),
        other => Err(ShravError::Type(format!(
            "{}() expects a string key, got {}",
            function,
            other.type_name()
        ))),
    }
}

fn dict_method(dict: Rc<RefCell<Dict>>, name: &str) -> Option<Value> {
    let method: Value = match name {
        "keys" => Value::native(name, 0, move |_, _| {
            Ok(Value::list(dict.borrow().keys().cloned().map(Value::Str).collect()))
        }),

        "values" => Value::native(name, 0, move |_, _| {
            Ok(Value::list(dict.borrow().values().cloned().collect()))
        }),

        "has" => Value::native(name, 1, move |_, args| {
            let key: String = dict_key("has", &arg(args, 0))?;
            Ok(Value::Bool(dict.borrow().contains_key(&key)))
        }),

        "get" => Value::native(name, 1, move |_, args| {
            let key: String = dict_key("get", &arg(args, 0))?;
            Ok(dict.borrow().get(&key).cloned().unwrap_or(Value::Null))
        }),

        "len" => Value::native(name, 0, move |_, _| Ok(Value::Int(dict.borrow().len() as i64))),

        _ => return None,
    };

    Some(method)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_coercion_truncates_and_parses() {
        assert_eq!(to_int(&Value::Float(2.9)), Some(2));
        assert_eq!(to_int(&Value::Float(-2.9)), Some(-2));
        assert_eq!(to_int(&Value::Bool(true)), Some(1));
        assert_eq!(to_int(&Value::Str(" 42 ".into())), Some(42));
        assert_eq!(to_int(&Value::Str("3.5".into())), Some(3));
        assert_eq!(to_int(&Value::Str("abc".into())), None);
        assert_eq!(to_int(&Value::Null), None);
    }

    #[test]
    fn unknown_methods_are_absent() {
        assert!(method(&Value::Str("x".into()), "upper").is_some());
        assert!(method(&Value::Str("x".into()), "frobnicate").is_none());
        assert!(method(&Value::Int(1), "len").is_none());
    }
}
