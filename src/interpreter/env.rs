use std::{cell::RefCell, rc::Rc};

use fnv::FnvHashMap;

use crate::{errors, lexer::Token, TlpsError};

use super::Value;

/// A shared handle to one frame of the scope chain. Closures hold a clone of
/// the frame they were declared in, which keeps it alive after its block exits.
#[derive(Clone, Debug, Default)]
pub struct Environment(Rc<RefCell<Scope>>);

#[derive(Debug, Default)]
pub struct Scope {
    values: FnvHashMap<String, Value>,
    parent: Option<Environment>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn branch(&self) -> Environment {
        let child = Scope {
            parent: Some(self.clone()),
            ..Default::default()
        };

        Environment(Rc::new(RefCell::new(child)))
    }

    /// Binds `key` in this frame only, replacing any existing binding.
    pub fn define<K: Into<String>>(&self, key: K, value: Value) {
        self.0.borrow_mut().values.insert(key.into(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value, TlpsError> {
        self.lookup(name.lexeme()).ok_or_else(|| undefined(name))
    }

    pub fn lookup(&self, key: &str) -> Option<Value> {
        let scope = self.0.borrow();
        match scope.values.get(key) {
            Some(value) => Some(value.clone()),
            None => scope.parent.as_ref().and_then(|p| p.lookup(key)),
        }
    }

    pub fn assign(&self, name: &Token, value: Value) -> Result<(), TlpsError> {
        let mut scope = self.0.borrow_mut();
        if let Some(slot) = scope.values.get_mut(name.lexeme()) {
            *slot = value;
            return Ok(());
        }

        match &scope.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(undefined(name)),
        }
    }

    /// Reads from the frame exactly `distance` hops up the chain, without searching.
    pub fn get_at(&self, distance: usize, key: &str) -> Option<Value> {
        let env = self.ancestor(distance)?;
        let value = env.0.borrow().values.get(key).cloned();
        value
    }

    pub fn assign_at(&self, distance: usize, key: &str, value: Value) -> bool {
        match self.ancestor(distance) {
            Some(env) => {
                env.0.borrow_mut().values.insert(key.to_string(), value);
                true
            }
            None => false,
        }
    }

    fn ancestor(&self, distance: usize) -> Option<Environment> {
        let mut env = self.clone();
        for _ in 0..distance {
            let parent = env.0.borrow().parent.clone()?;
            env = parent;
        }

        Some(env)
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

fn undefined(name: &Token) -> TlpsError {
    errors::runtime(name, format!("Undefined variable '{}'.", name.lexeme()))
}
