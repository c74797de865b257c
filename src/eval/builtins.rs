use std::thread;
use std::time::Duration;

use rand::Rng;

use super::value::{NativeError, Value};

/// Largest magnitude at which every integer is an exact `f64`.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Upper bound on the number of elements `range` will allocate.
pub const MAX_RANGE_LEN: usize = 10_000_000;

fn builtin(
    name: &str,
    func: impl Fn(&[Value]) -> Result<Value, NativeError> + 'static,
) -> (String, Value) {
    (name.to_string(), Value::native(name, func))
}

fn check_arity(name: &str, args: &[Value], expected: usize) -> Result<(), NativeError> {
    if args.len() == expected {
        Ok(())
    } else {
        let plural = if expected == 1 { "" } else { "s" };
        Err(NativeError::Runtime(format!(
            "{}() expects {} argument{}, got {}",
            name,
            expected,
            plural,
            args.len()
        )))
    }
}

fn number_arg(name: &str, value: &Value) -> Result<f64, NativeError> {
    value.as_number().ok_or_else(|| {
        NativeError::Type(format!(
            "{}() expects a number, got {}",
            name,
            value.type_name()
        ))
    })
}

fn string_arg<'a>(name: &str, value: &'a Value) -> Result<&'a str, NativeError> {
    match value {
        Value::String(s) => Ok(s.as_str()),
        other => Err(NativeError::Type(format!(
            "{}() expects a string, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn unary_math(name: &'static str, op: fn(f64) -> f64) -> (String, Value) {
    builtin(name, move |args| {
        check_arity(name, args, 1)?;
        Ok(Value::Number(op(number_arg(name, &args[0])?)))
    })
}

fn binary_math(name: &'static str, op: fn(f64, f64) -> f64) -> (String, Value) {
    builtin(name, move |args| {
        check_arity(name, args, 2)?;
        let a = number_arg(name, &args[0])?;
        let b = number_arg(name, &args[1])?;
        Ok(Value::Number(op(a, b)))
    })
}

/// Natives that need nothing from the host. Host-bound ones (`print`,
/// `get_argument`, the bridge calls) are added by `stdlib::register_stdlib`.
pub fn all_builtins() -> Vec<(String, Value)> {
    vec![
        builtin("length", |args| {
            check_arity("length", args, 1)?;
            match &args[0] {
                Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
                Value::Array(items) => Ok(Value::Number(items.borrow().len() as f64)),
                other => Err(NativeError::Type(format!(
                    "length() expects a string or array, got {}",
                    other.type_name()
                ))),
            }
        }),
        builtin("random", |args| match args.len() {
            0 => Ok(Value::Number(rand::thread_rng().gen::<f64>())),
            2 => {
                let (min, max) = match (&args[0], &args[1]) {
                    (Value::Number(a), Value::Number(b)) => (*a, *b),
                    _ => {
                        return Err(NativeError::Type(
                            "random(min, max) expects two numbers".to_string(),
                        ))
                    }
                };
                let roll = rand::thread_rng().gen::<f64>();
                Ok(Value::Number((roll * (max - min + 1.0)).floor() + min))
            }
            n => Err(NativeError::Runtime(format!(
                "random() expects 0 or 2 arguments, got {}",
                n
            ))),
        }),
        builtin("wait", |args| {
            check_arity("wait", args, 1)?;
            let seconds = number_arg("wait", &args[0])?;
            if seconds.is_nan() || seconds <= 0.0 {
                return Ok(Value::Null);
            }
            let duration = Duration::try_from_secs_f64(seconds).map_err(|_| {
                NativeError::Runtime(format!("wait() duration {} is too long", seconds))
            })?;
            thread::sleep(duration);
            Ok(Value::Null)
        }),
        builtin("range", |args| {
            let (start, end) = match args.len() {
                1 => (0.0, number_arg("range", &args[0])?),
                2 => (number_arg("range", &args[0])?, number_arg("range", &args[1])?),
                n => {
                    return Err(NativeError::Runtime(format!(
                        "range() expects 1 or 2 arguments, got {}",
                        n
                    )))
                }
            };
            if !start.is_finite() || !end.is_finite() {
                return Err(NativeError::Runtime(
                    "range() bounds must be finite".to_string(),
                ));
            }
            if start.abs() > MAX_EXACT_INT || end.abs() > MAX_EXACT_INT {
                return Err(NativeError::Runtime(
                    "range() bounds must lie within +/-2^53".to_string(),
                ));
            }
            let span = (end - start).ceil();
            if span <= 0.0 {
                return Ok(Value::array(Vec::new()));
            }
            if span > MAX_RANGE_LEN as f64 {
                return Err(NativeError::Runtime(format!(
                    "range() would produce {} elements, the limit is {}",
                    span, MAX_RANGE_LEN
                )));
            }
            let items = (0..span as usize)
                .map(|k| Value::Number(start + k as f64))
                .collect();
            Ok(Value::array(items))
        }),
        builtin("type", |args| {
            check_arity("type", args, 1)?;
            Ok(Value::string(args[0].type_name()))
        }),
        builtin("str", |args| {
            check_arity("str", args, 1)?;
            Ok(Value::String(args[0].to_string()))
        }),
        builtin("num", |args| {
            check_arity("num", args, 1)?;
            match &args[0] {
                Value::Number(n) => Ok(Value::Number(*n)),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Number)
                    .map_err(|_| NativeError::Type(format!("Cannot convert '{}' to number", s))),
                other => Err(NativeError::Type(format!(
                    "Cannot convert {} to number",
                    other.type_name()
                ))),
            }
        }),
        builtin("push", |args| {
            check_arity("push", args, 2)?;
            match &args[0] {
                Value::Array(items) => {
                    items.borrow_mut().push(args[1].clone());
                    Ok(Value::Null)
                }
                other => Err(NativeError::Type(format!(
                    "push() expects an array as first argument, got {}",
                    other.type_name()
                ))),
            }
        }),
        builtin("pop", |args| {
            check_arity("pop", args, 1)?;
            match &args[0] {
                Value::Array(items) => items
                    .borrow_mut()
                    .pop()
                    .ok_or_else(|| NativeError::Runtime("Cannot pop from empty array".to_string())),
                other => Err(NativeError::Type(format!(
                    "pop() expects an array, got {}",
                    other.type_name()
                ))),
            }
        }),
        builtin("keys", |args| {
            check_arity("keys", args, 1)?;
            match &args[0] {
                Value::Object(entries) => Ok(Value::array(
                    entries.borrow().keys().map(|k| Value::string(k.as_str())).collect(),
                )),
                other => Err(NativeError::Type(format!(
                    "keys() expects an object, got {}",
                    other.type_name()
                ))),
            }
        }),
        builtin("join", |args| {
            check_arity("join", args, 2)?;
            let sep = string_arg("join", &args[1])?;
            match &args[0] {
                Value::Array(items) => {
                    let parts: Vec<String> = items.borrow().iter().map(|v| v.to_string()).collect();
                    Ok(Value::String(parts.join(sep)))
                }
                other => Err(NativeError::Type(format!(
                    "join() expects an array, got {}",
                    other.type_name()
                ))),
            }
        }),
        builtin("split", |args| {
            check_arity("split", args, 2)?;
            let s = string_arg("split", &args[0])?;
            let sep = string_arg("split", &args[1])?;
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(sep).map(Value::string).collect()
            };
            Ok(Value::array(parts))
        }),
        builtin("upper", |args| {
            check_arity("upper", args, 1)?;
            Ok(Value::String(string_arg("upper", &args[0])?.to_uppercase()))
        }),
        builtin("lower", |args| {
            check_arity("lower", args, 1)?;
            Ok(Value::String(string_arg("lower", &args[0])?.to_lowercase()))
        }),
        builtin("contains", |args| {
            check_arity("contains", args, 2)?;
            match &args[0] {
                Value::String(s) => {
                    let needle = string_arg("contains", &args[1])?;
                    Ok(Value::Bool(s.contains(needle)))
                }
                Value::Array(items) => Ok(Value::Bool(items.borrow().contains(&args[1]))),
                other => Err(NativeError::Type(format!(
                    "contains() expects a string or array, got {}",
                    other.type_name()
                ))),
            }
        }),
        unary_math("abs", f64::abs),
        unary_math("floor", f64::floor),
        unary_math("ceil", f64::ceil),
        unary_math("round", f64::round),
        unary_math("sqrt", f64::sqrt),
        binary_math("min", f64::min),
        binary_math("max", f64::max),
        binary_math("pow", f64::powf),
    ]
}
