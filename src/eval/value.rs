use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::Block;
use crate::error::EzError;
use crate::span::Position;
use crate::stack::ensure_sufficient_stack;

use super::env::Env;

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type ObjectRef = Rc<RefCell<IndexMap<String, Value>>>;

/// Runtime values. Arrays and objects are shared handles: copying one into
/// another variable aliases the same storage.
#[derive(Clone)]
pub enum Value {
    Null,
    Number(f64),
    String(String),
    Bool(bool),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Rc<Function>),
    Native(Rc<NativeFunction>),
}

/// A user-defined function together with the frame it was declared in.
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Block>,
    pub closure: Env,
    /// File the declaration was read from. Imports and errors inside the
    /// body are resolved and attributed against it.
    pub origin: Option<PathBuf>,
}

pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, NativeError>;

pub struct NativeFunction {
    pub name: String,
    pub func: Rc<NativeFn>,
}

/// Failure raised inside a native function. The evaluator attaches the
/// position of the call expression.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeError {
    Runtime(String),
    Type(String),
}

impl NativeError {
    pub fn at(self, pos: Position) -> EzError {
        match self {
            NativeError::Runtime(message) => EzError::runtime(message, pos),
            NativeError::Type(message) => EzError::type_mismatch(message, pos),
        }
    }
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(entries: IndexMap<String, Value>) -> Value {
        Value::Object(Rc::new(RefCell::new(entries)))
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn native(
        name: &str,
        func: impl Fn(&[Value]) -> Result<Value, NativeError> + 'static,
    ) -> Value {
        Value::Native(Rc::new(NativeFunction {
            name: name.to_string(),
            func: Rc::new(func),
        }))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Native(_) => "native-function",
        }
    }

    /// `null`, `false`, `0` and the empty string are falsy. Everything else,
    /// including `NaN` and empty arrays, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Native(_) => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        format!("{}", n)
    }
}

/// Equality used by `==` and `!=`. Values of different kinds are never equal.
/// Arrays compare element-wise; objects and functions compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        values_equal(self, other, &mut Vec::new())
    }
}

/// `open` holds the array pairs already being compared further up. Meeting
/// one again means every element on the way round matched, so the cycle is
/// treated as equal.
fn values_equal(a: &Value, b: &Value, open: &mut Vec<(*const (), *const ())>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let pair = (Rc::as_ptr(x) as *const (), Rc::as_ptr(y) as *const ());
            if open.contains(&pair) {
                return true;
            }
            let (xs, ys) = (x.borrow(), y.borrow());
            if xs.len() != ys.len() {
                return false;
            }
            open.push(pair);
            let equal = ensure_sufficient_stack(|| {
                xs.iter().zip(ys.iter()).all(|(l, r)| values_equal(l, r, open))
            });
            open.pop();
            equal
        }
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Native(x), Value::Native(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, &mut Vec::new())
    }
}

/// A container that is already being written (it contains itself) is shown
/// as `[...]` or `{...}`.
fn write_value(f: &mut fmt::Formatter<'_>, value: &Value, open: &mut Vec<*const ()>) -> fmt::Result {
    match value {
        Value::Null => write!(f, "null"),
        Value::Number(n) => write!(f, "{}", format_number(*n)),
        Value::String(s) => write!(f, "{}", s),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Array(items) => {
            let id = Rc::as_ptr(items) as *const ();
            if open.contains(&id) {
                return write!(f, "[...]");
            }
            open.push(id);
            write!(f, "[")?;
            for (i, v) in items.borrow().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                ensure_sufficient_stack(|| write_value(f, v, open))?;
            }
            open.pop();
            write!(f, "]")
        }
        Value::Object(entries) => {
            let id = Rc::as_ptr(entries) as *const ();
            if open.contains(&id) {
                return write!(f, "{{...}}");
            }
            open.push(id);
            write!(f, "{{")?;
            for (i, (k, v)) in entries.borrow().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: ", k)?;
                ensure_sufficient_stack(|| write_value(f, v, open))?;
            }
            open.pop();
            write!(f, "}}")
        }
        Value::Function(func) => write!(f, "<function {}>", func.name),
        Value::Native(native) => write!(f, "<native function {}>", native.name),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_script_output() {
        assert_eq!(Value::Number(14.0).to_string(), "14");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::Null.to_string(), "null");
        let arr = Value::array(vec![Value::Number(1.0), Value::string("a")]);
        assert_eq!(arr.to_string(), "[1, a]");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::string("0").is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn no_coercion_between_kinds() {
        assert_ne!(Value::Number(1.0), Value::string("1"));
        assert_ne!(Value::Bool(false), Value::Null);
        assert_ne!(Value::Number(0.0), Value::Bool(false));
    }

    #[test]
    fn arrays_compare_by_content_objects_by_identity() {
        let a = Value::array(vec![Value::Number(1.0)]);
        let b = Value::array(vec![Value::Number(1.0)]);
        assert_eq!(a, b);

        let o1 = Value::object(IndexMap::new());
        let o2 = Value::object(IndexMap::new());
        assert_ne!(o1, o2);
        assert_eq!(o1.clone(), o1);
    }

    #[test]
    fn self_referential_containers_compare_and_display() {
        let a = Value::array(vec![Value::Number(1.0)]);
        let b = Value::array(vec![Value::Number(1.0)]);
        if let (Value::Array(xs), Value::Array(ys)) = (&a, &b) {
            xs.borrow_mut().push(a.clone());
            ys.borrow_mut().push(b.clone());
        }
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "[1, [...]]");

        let mut entries = IndexMap::new();
        entries.insert("n".to_string(), Value::Number(2.0));
        let o = Value::object(entries);
        if let Value::Object(map) = &o {
            map.borrow_mut().insert("me".to_string(), o.clone());
        }
        assert_eq!(o.to_string(), "{n: 2, me: {...}}");
    }
}
