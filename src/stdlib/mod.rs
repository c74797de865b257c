use std::rc::Rc;

use crate::eval::builtins::all_builtins;
use crate::eval::env::Env;
use crate::eval::host::Host;
use crate::eval::value::{NativeError, Value};

/// Seed the global frame with every native function. Calling this again with
/// a different host rebinds the host-backed natives.
pub fn register_stdlib(env: &Env, host: Rc<dyn Host>) {
    for (name, value) in all_builtins() {
        env.declare(name, value);
    }
    register_host_natives(env, host);
}

fn expect_string<'a>(name: &str, position: &str, value: &'a Value) -> Result<&'a str, NativeError> {
    match value {
        Value::String(s) => Ok(s.as_str()),
        other => Err(NativeError::Type(format!(
            "{}() expects a string as {} argument, got {}",
            name,
            position,
            other.type_name()
        ))),
    }
}

fn register_host_natives(env: &Env, host: Rc<dyn Host>) {
    let h = host.clone();
    env.declare(
        "print",
        Value::native("print", move |args| {
            let line: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            h.print(&line.join(" "));
            Ok(Value::Null)
        }),
    );

    let h = host.clone();
    env.declare(
        "get_argument",
        Value::native("get_argument", move |args| {
            if args.is_empty() || args.len() > 2 {
                return Err(NativeError::Runtime(format!(
                    "get_argument() expects 1 or 2 arguments, got {}",
                    args.len()
                )));
            }
            let key = expect_string("get_argument", "first", &args[0])?;
            let fallback = args.get(1).cloned().unwrap_or(Value::Null);
            Ok(h.argument(key).map(Value::String).unwrap_or(fallback))
        }),
    );

    let h = host.clone();
    env.declare(
        "bridge_import",
        Value::native("bridge_import", move |args| {
            if args.len() != 1 {
                return Err(NativeError::Runtime(format!(
                    "bridge_import() expects 1 argument, got {}",
                    args.len()
                )));
            }
            let module = expect_string("bridge_import", "first", &args[0])?;
            h.load_module(module).map_err(NativeError::Runtime)
        }),
    );

    let h = host;
    env.declare(
        "bridge_call",
        Value::native("bridge_call", move |args| {
            if args.len() < 2 {
                return Err(NativeError::Runtime(format!(
                    "bridge_call() expects at least 2 arguments, got {}",
                    args.len()
                )));
            }
            let module = expect_string("bridge_call", "first", &args[0])?;
            let function = expect_string("bridge_call", "second", &args[1])?;
            h.call_module(module, function, &args[2..])
                .map_err(NativeError::Runtime)
        }),
    );
}
