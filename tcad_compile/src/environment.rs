use std::{collections::HashMap, rc::Rc};

use log::debug;

use crate::{stdlib, types::Value};

/// Top level definitions of a session. Names are only ever added or
/// redefined, never removed.
#[derive(Debug, Default, Clone)]
pub struct Namespace {
    values: HashMap<String, Value>,
}

impl Namespace {
    /// A namespace seeded with the builtin definitions.
    pub fn new() -> Self {
        let mut names = Self::default();
        stdlib::init(&mut names);
        names
    }

    pub fn set(&mut self, name: &str, value: Value) {
        debug!("Set {name} -> {value}");
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        debug!("Get {name}");
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// What an identifier refers to during analysis.
#[derive(Clone, Debug)]
pub enum Binding {
    /// A lambda parameter, `depth` frames out from the innermost lambda.
    Local { depth: usize, index: usize },
    /// A top level definition, captured by value.
    Global(Value),
}

/// The analysis-time view of a namespace: read-only access to the top
/// level definitions plus the parameters of the enclosing lambdas.
#[derive(Debug)]
pub struct Environ<'a> {
    names: &'a Namespace,
    scopes: Vec<Vec<String>>,
}

impl<'a> Environ<'a> {
    pub fn new(names: &'a Namespace) -> Self {
        Self {
            names,
            scopes: Vec::default(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Binding> {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if let Some(index) = scope.iter().position(|param| param == name) {
                debug!("Resolved {name} at depth {depth}");
                return Some(Binding::Local { depth, index });
            }
        }
        self.names.get(name).cloned().map(Binding::Global)
    }

    pub fn init_scope(&mut self, params: Vec<String>) {
        self.scopes.push(params);
    }

    pub fn end_scope(&mut self) {
        self.scopes.pop();
    }
}

/// Argument values of one lambda call, linked to the frame the lambda
/// was created in.
#[derive(Debug)]
pub struct Frame {
    values: Vec<Value>,
    parent: Option<Rc<Frame>>,
}

impl Frame {
    pub fn new(values: Vec<Value>, parent: Option<Rc<Frame>>) -> Self {
        Self { values, parent }
    }

    pub fn get_at_depth(&self, depth: usize, index: usize) -> Option<&Value> {
        if depth == 0 {
            return self.values.get(index);
        }
        self.parent.as_ref()?.get_at_depth(depth - 1, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace() {
        let mut names = Namespace::new();
        assert!(names.contains("pi"));
        let builtins = names.len();
        names.set("x", Value::Number(3.0));
        names.set("x", Value::Number(4.0));
        assert_eq!(names.len(), builtins + 1);
        assert_eq!(names.get("x").unwrap().to_string(), "4");
        assert!(names.get("y").is_none());
    }

    #[test]
    fn environ_scopes() {
        let mut names = Namespace::default();
        names.set("a", Value::Number(1.0));
        let mut env = Environ::new(&names);
        assert!(matches!(env.lookup("a"), Some(Binding::Global(_))));

        env.init_scope(vec!["a".to_string(), "b".to_string()]);
        env.init_scope(vec!["c".to_string()]);
        assert!(matches!(
            env.lookup("a"),
            Some(Binding::Local { depth: 1, index: 0 })
        ));
        assert!(matches!(
            env.lookup("c"),
            Some(Binding::Local { depth: 0, index: 0 })
        ));
        env.end_scope();
        env.end_scope();
        assert!(env.lookup("b").is_none());
    }

    #[test]
    fn frames() {
        let outer = Rc::new(Frame::new(vec![Value::Number(1.0)], None));
        let inner = Frame::new(vec![Value::Number(2.0)], Some(outer));
        assert_eq!(inner.get_at_depth(0, 0).unwrap().to_string(), "2");
        assert_eq!(inner.get_at_depth(1, 0).unwrap().to_string(), "1");
        assert!(inner.get_at_depth(2, 0).is_none());
        assert!(inner.get_at_depth(0, 1).is_none());
    }
}
