use std::collections::HashMap;

use super::{kinds::KindRef, values::ValueRef};

/// Names visible at one level of nesting. Values and kinds live in
/// separate namespaces.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    values: HashMap<String, ValueRef>,
    kinds: HashMap<String, KindRef>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, name: &str) -> Option<ValueRef> {
        self.values.get(name).copied()
    }

    pub fn kind(&self, name: &str) -> Option<KindRef> {
        self.kinds.get(name).copied()
    }

    /// Binds `name`, or returns the existing binding if there is one.
    pub fn set_value(&mut self, name: impl Into<String>, value: ValueRef) -> Result<(), ValueRef> {
        let name = name.into();

        match self.values.get(&name) {
            Some(existing) => Err(*existing),

            None => {
                self.values.insert(name, value);
                Ok(())
            },
        }
    }

    /// Binds `name`, or returns the existing binding if there is one.
    pub fn set_kind(&mut self, name: impl Into<String>, kind: KindRef) -> Result<(), KindRef> {
        let name = name.into();

        match self.kinds.get(&name) {
            Some(existing) => Err(*existing),

            None => {
                self.kinds.insert(name, kind);
                Ok(())
            },
        }
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, ValueRef)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn kinds(&self) -> impl Iterator<Item = (&str, KindRef)> {
        self.kinds.iter().map(|(name, kind)| (name.as_str(), *kind))
    }
}

/// Nested scopes of a module. The bottom scope holds the module's
/// top-level declarations and is never popped.
#[derive(Clone, Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "popped the module scope");

        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn module_scope(&self) -> &Scope {
        &self.scopes[0]
    }

    pub(super) fn module_scope_mut(&mut self) -> &mut Scope {
        &mut self.scopes[0]
    }

    fn innermost_mut(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: ValueRef) -> Result<(), ValueRef> {
        self.innermost_mut().set_value(name, value)
    }

    pub fn set_kind(&mut self, name: impl Into<String>, kind: KindRef) -> Result<(), KindRef> {
        self.innermost_mut().set_kind(name, kind)
    }

    /// Looks `name` up, innermost scope first.
    pub fn find_value(&self, name: &str) -> Option<ValueRef> {
        self.scopes.iter().rev().find_map(|scope| scope.value(name))
    }

    /// Looks `name` up, innermost scope first.
    pub fn find_kind(&self, name: &str) -> Option<KindRef> {
        self.scopes.iter().rev().find_map(|scope| scope.kind(name))
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
