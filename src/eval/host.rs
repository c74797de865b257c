use std::collections::HashMap;

use super::value::Value;

const NO_BUS: &str = "no message bus attached";
const NO_BRIDGE: &str = "no module bridge attached";

/// Everything the evaluator needs from the outside world. The defaults
/// describe a host with stdout and nothing else; embedders override the
/// hooks they can serve.
pub trait Host {
    fn print(&self, text: &str) {
        println!("{}", text);
    }

    fn send(&self, _target: &Value, _message: &Value) -> Result<(), String> {
        Err(NO_BUS.to_string())
    }

    fn reply(&self, _target: &Value, _message: &Value) -> Result<(), String> {
        Err(NO_BUS.to_string())
    }

    fn react(&self, _target: &Value, _emoji: &Value) -> Result<(), String> {
        Err(NO_BUS.to_string())
    }

    /// Resolve `use "name" as alias`.
    fn load_module(&self, _name: &str) -> Result<Value, String> {
        Err(NO_BRIDGE.to_string())
    }

    fn call_module(&self, _module: &str, _function: &str, _args: &[Value]) -> Result<Value, String> {
        Err(NO_BRIDGE.to_string())
    }

    /// Look up a `KEY=VALUE` launch argument.
    fn argument(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Host used by the command line: prints to stdout and serves launch
/// arguments.
#[derive(Debug, Default, Clone)]
pub struct StdHost {
    args: HashMap<String, String>,
}

impl StdHost {
    pub fn new() -> Self {
        StdHost::default()
    }

    /// Build the argument table from raw `KEY=VALUE` strings. Entries without
    /// an `=` are ignored; a repeated key keeps its first value.
    pub fn with_args<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = HashMap::new();
        for entry in raw {
            if let Some((key, value)) = entry.as_ref().split_once('=') {
                args.entry(key.to_string())
                    .or_insert_with(|| value.to_string());
            }
        }
        StdHost { args }
    }
}

impl Host for StdHost {
    fn argument(&self, name: &str) -> Option<String> {
        self.args.get(name).cloned()
    }
}
