use std::cell::RefCell;
use std::rc::Rc;

use super::value::Value;

/// A lexical frame. Frames are shared: closures keep the frame they were
/// created in alive, and mutation through one handle is visible through
/// all of them.
pub type Env = Rc<RefCell<EnvInner>>;

/// Bindings are kept in definition order so `getEnv` and module exports
/// are deterministic.
pub struct EnvInner {
    vars: Vec<(String, Value)>,
    parent: Option<Env>,
}

impl EnvInner {
    pub fn root() -> Env {
        Rc::new(RefCell::new(EnvInner {
            vars: Vec::new(),
            parent: None,
        }))
    }

    pub fn with_parent(parent: &Env) -> Env {
        Rc::new(RefCell::new(EnvInner {
            vars: Vec::new(),
            parent: Some(parent.clone()),
        }))
    }

    /// Introduce a binding in this frame, shadowing any outer binding and
    /// replacing an earlier cell of the same name in the same frame.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.vars.push((name, value)),
        }
    }

    /// Rebind the nearest existing cell. Returns false when the name is
    /// unbound anywhere in the chain.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.vars.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
            return true;
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().assign(name, value),
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some((_, value)) = self.vars.iter().find(|(n, _)| n == name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.borrow().get(name))
    }

    pub fn parent(&self) -> Option<Env> {
        self.parent.clone()
    }

    /// Bindings of this frame only, in definition order.
    pub fn own_bindings(&self) -> Vec<(String, Value)> {
        self.vars.clone()
    }

    /// Flatten the whole chain, innermost binding winning, stopping
    /// before `until` when given (used to cut module environments off at
    /// the startup frame).
    pub fn flatten(env: &Env, until: Option<&Env>) -> Vec<(String, Value)> {
        let mut chain = Vec::new();
        let mut cursor = Some(env.clone());
        while let Some(frame) = cursor {
            if let Some(stop) = until {
                if Rc::ptr_eq(&frame, stop) {
                    break;
                }
            }
            chain.push(frame.borrow().own_bindings());
            cursor = frame.borrow().parent();
        }
        let mut out: Vec<(String, Value)> = Vec::new();
        for frame in chain.into_iter().rev() {
            for (name, value) in frame {
                match out.iter_mut().find(|(n, _)| *n == name) {
                    Some(slot) => slot.1 = value,
                    None => out.push((name, value)),
                }
            }
        }
        out
    }
}
