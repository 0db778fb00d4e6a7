use crate::error::{Result, ShravError};
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope.  Closures, child scopes and the interpreter all
/// hold one; a scope lives as long as its longest holder.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One scope record: its own bindings plus an optional link outward.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Fresh shared root scope.
    pub fn new_ref() -> EnvRef {
        Rc::new(RefCell::new(Environment::new()))
    }

    /// Fresh shared child of `enclosing`.
    pub fn child_of(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(enclosing))))
    }

    /// Insert or overwrite `name` in this scope only.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(ShravError::undefined(name, line))
        }
    }

    /// Rebind an existing name in the nearest scope that has it; never
    /// creates a binding.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(ShravError::undefined(name, line))
        }
    }

    /// Read `name` from exactly the scope `distance` links outward.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Result<Value> {
        let scope: EnvRef = Self::ancestor(env, distance, name)?;
        let value = scope.borrow().values.get(name).cloned();

        value.ok_or_else(|| {
            ShravError::Name(format!(
                "Undefined variable '{}' at scope distance {}",
                name, distance
            ))
        })
    }

    /// Rebind `name` in exactly the scope `distance` links outward.  The
    /// name must already be bound there.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) -> Result<()> {
        let scope: EnvRef = Self::ancestor(env, distance, name)?;
        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ShravError::Name(format!(
                "Undefined variable '{}' at scope distance {}",
                name, distance
            ))),
        }
    }

    fn ancestor(env: &EnvRef, distance: usize, name: &str) -> Result<EnvRef> {
        let mut scope: EnvRef = Rc::clone(env);

        for hop in 0..distance {
            let next = scope.borrow().enclosing.clone();

            scope = next.ok_or_else(|| {
                debug!("Scope chain ended after {} of {} hops", hop, distance);

                ShravError::Name(format!(
                    "Cannot resolve '{}': scope distance {} exceeds the chain",
                    name, distance
                ))
            })?;
        }

        Ok(scope)
    }

    /// Bindings of this scope alone, in no particular order.
    pub fn bindings(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}
