use super::{kinds::KindRef, module::ModuleId};

/// Index of a value in a [`ValueArena`].
pub type ValueRef = usize;

/// What a name in value position is bound to.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Variable {
        name: String,
        kind: KindRef,
        constant: bool,
    },
    Function {
        name: String,
        kind: KindRef,
    },
    Module {
        name: String,
        module: ModuleId,
    },
    /// `self` inside a method body.
    SelfValue { kind: KindRef },
}

impl Value {
    pub fn name(&self) -> &str {
        match self {
            Value::Variable { name, .. } | Value::Function { name, .. } | Value::Module { name, .. } => name,
            Value::SelfValue { .. } => "self",
        }
    }

    /// Modules have no kind.
    pub fn kind(&self) -> Option<KindRef> {
        match self {
            Value::Variable { kind, .. } | Value::Function { kind, .. } | Value::SelfValue { kind } => Some(*kind),
            Value::Module { .. } => None,
        }
    }

    pub fn is_assignable(&self) -> bool {
        matches!(self, Value::Variable { constant: false, .. })
    }
}

#[derive(Clone, Debug, Default)]
pub struct ValueArena {
    values: Vec<Value>,
}

impl ValueArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: Value) -> ValueRef {
        self.values.push(value);
        self.values.len() - 1
    }

    pub fn get(&self, value_ref: ValueRef) -> &Value {
        &self.values[value_ref]
    }

    pub(super) fn get_mut(&mut self, value_ref: ValueRef) -> &mut Value {
        &mut self.values[value_ref]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
