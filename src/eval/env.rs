use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::value::Value;

/// A lexical scope frame. Cloning an `Env` clones the handle, not the frame:
/// closures and child frames share the bindings they were created with.
#[derive(Clone)]
pub struct Env {
    inner: Rc<EnvInner>,
}

struct EnvInner {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Env>,
}

/// Returned by [`Env::assign`] when no frame in the chain binds the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unbound;

impl Env {
    pub fn new() -> Self {
        Env {
            inner: Rc::new(EnvInner {
                bindings: RefCell::new(HashMap::new()),
                parent: None,
            }),
        }
    }

    pub fn extend(&self) -> Self {
        Env {
            inner: Rc::new(EnvInner {
                bindings: RefCell::new(HashMap::new()),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Bind `name` in this frame, shadowing any outer binding. Redeclaring a
    /// name in the same frame overwrites it.
    pub fn declare(&self, name: impl Into<String>, value: Value) {
        self.inner.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Update the nearest existing binding of `name`.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), Unbound> {
        if let Some(slot) = self.inner.bindings.borrow_mut().get_mut(name) {
            *slot = value;
            return Ok(());
        }
        match self.inner.parent {
            Some(ref parent) => parent.assign(name, value),
            None => Err(Unbound),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.inner.bindings.borrow().get(name) {
            Some(v.clone())
        } else if let Some(ref parent) = self.inner.parent {
            parent.lookup(name)
        } else {
            None
        }
    }

    /// Whether `name` is bound in this frame, ignoring parents.
    pub fn is_declared(&self, name: &str) -> bool {
        self.inner.bindings.borrow().contains_key(name)
    }

    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.inner.bindings.borrow().get(name).cloned()
    }

    /// Names bound in this frame, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.bindings.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::new()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Env{{{} bindings}}", self.inner.bindings.borrow().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_shadows_outer_binding() {
        let outer = Env::new();
        outer.declare("x", Value::Number(1.0));
        let inner = outer.extend();
        inner.declare("x", Value::Number(2.0));
        assert_eq!(inner.lookup("x"), Some(Value::Number(2.0)));
        assert_eq!(outer.lookup("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn assign_walks_to_declaring_frame() {
        let outer = Env::new();
        outer.declare("count", Value::Number(0.0));
        let inner = outer.extend().extend();
        inner.assign("count", Value::Number(5.0)).unwrap();
        assert_eq!(outer.get_local("count"), Some(Value::Number(5.0)));
        assert!(!inner.is_declared("count"));
    }

    #[test]
    fn assign_to_unbound_name_fails() {
        let env = Env::new().extend();
        assert_eq!(env.assign("ghost", Value::Null), Err(Unbound));
        assert_eq!(env.lookup("ghost"), None);
    }

    #[test]
    fn redeclare_overwrites_in_same_frame() {
        let env = Env::new();
        env.declare("a", Value::Number(1.0));
        env.declare("a", Value::String("one".into()));
        assert_eq!(env.get_local("a"), Some(Value::String("one".into())));
        assert_eq!(env.names(), vec!["a".to_string()]);
    }
}
