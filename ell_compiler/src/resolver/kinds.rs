use std::collections::HashMap;

use super::{module::ModuleId, values::ValueRef};
use crate::errors::Span;

/// Index of a kind in a [`KindArena`].
/// Cycles between kinds live in index space, so they're free to form.
pub type KindRef = usize;

// Fixed slots, created by `KindArena::new`.
pub const NUMBER: KindRef = 0;
pub const BYTE: KindRef = 1;
pub const CHAR: KindRef = 2;
pub const STRING: KindRef = 3;
pub const BOOL: KindRef = 4;
pub const ANY: KindRef = 5;
pub const SELF: KindRef = 6;
pub const VOID: KindRef = 7;
pub const NULL: KindRef = 8;
/// Kind of a variable whose type comes from an initializer that hasn't
/// been checked yet.
pub const UNRESOLVED: KindRef = 9;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Length {
    Fixed(usize),
    /// `[..]T`
    Vector,
}

/// A resolved type.
#[derive(Clone, Debug, PartialEq)]
pub enum Kind {
    /// A declared name whose definition hasn't been filled in yet.
    Unresolved,
    Number,
    Byte,
    Char,
    String,
    Bool,
    Any,
    /// Placeholder for the target of a method.
    SelfKind,
    Void,
    Null,
    Array {
        element: KindRef,
        length: Length,
    },
    Function {
        params: Vec<KindRef>,
        ret: KindRef,
        rest: bool,
    },
    Struct {
        /// `None` for struct literals and `struct {...}` kind expressions.
        name: Option<String>,
        extends: Vec<KindRef>,
        props: Vec<(String, KindRef)>,
        implements: Option<KindRef>,
        module: ModuleId,
    },
    Interface {
        name: String,
        extends: Vec<KindRef>,
        props: Vec<(String, KindRef)>,
    },
    /// Choices are numbered in declaration order.
    Enum {
        name: String,
        choices: Vec<String>,
    },
    Custom {
        name: String,
        target: KindRef,
    },
}

/// A method attached to a kind with `fn Target name()` or `impl`.
#[derive(Clone, Debug, PartialEq)]
pub struct Method {
    pub value: ValueRef,
    /// The module the method was declared in.
    pub module: ModuleId,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct KindSlot {
    pub kind: Kind,
    /// Kinds implementing this interface.
    pub refs: Vec<KindRef>,
    pub methods: HashMap<String, Method>,
    /// Module and name span of a declared kind.
    pub origin: Option<(ModuleId, Span)>,
}

impl KindSlot {
    fn new(kind: Kind, origin: Option<(ModuleId, Span)>) -> Self {
        Self {
            kind,
            refs: Vec::new(),
            methods: HashMap::new(),
            origin,
        }
    }
}

/// Holds every kind of a compilation.
#[derive(Clone, Debug)]
pub struct KindArena {
    slots: Vec<KindSlot>,
}

impl KindArena {
    pub fn new() -> Self {
        let builtins = [
            Kind::Number,
            Kind::Byte,
            Kind::Char,
            Kind::String,
            Kind::Bool,
            Kind::Any,
            Kind::SelfKind,
            Kind::Void,
            Kind::Null,
            Kind::Unresolved,
        ];

        Self {
            slots: builtins.iter().cloned().map(|kind| KindSlot::new(kind, None)).collect(),
        }
    }

    /// The built-in kind spelled `name` in type position.
    pub fn builtin(name: &str) -> Option<KindRef> {
        match name {
            "number" => Some(NUMBER),
            "byte" => Some(BYTE),
            "char" => Some(CHAR),
            "string" => Some(STRING),
            "bool" => Some(BOOL),
            "any" => Some(ANY),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn add(&mut self, kind: Kind) -> KindRef {
        self.slots.push(KindSlot::new(kind, None));
        self.slots.len() - 1
    }

    /// Adds a placeholder for a named kind, to be filled in with
    /// [`define`](KindArena::define).
    pub fn declare(&mut self, module: ModuleId, span: Span) -> KindRef {
        self.slots.push(KindSlot::new(Kind::Unresolved, Some((module, span))));
        self.slots.len() - 1
    }

    pub fn define(&mut self, kind_ref: KindRef, kind: Kind) {
        self.slots[kind_ref].kind = kind;
    }

    pub fn get(&self, kind_ref: KindRef) -> &Kind {
        &self.slots[kind_ref].kind
    }

    pub fn slot(&self, kind_ref: KindRef) -> &KindSlot {
        &self.slots[kind_ref]
    }

    pub(super) fn slot_mut(&mut self, kind_ref: KindRef) -> &mut KindSlot {
        &mut self.slots[kind_ref]
    }

    pub fn refs(&self, kind_ref: KindRef) -> &[KindRef] {
        &self.slots[kind_ref].refs
    }

    /// Records that `implementor` implements `interface`.
    pub fn add_ref(&mut self, interface: KindRef, implementor: KindRef) {
        let refs = &mut self.slots[interface].refs;

        if !refs.contains(&implementor) {
            refs.push(implementor);
        }
    }

    /// Follows aliases down to the kind they name. Gives up on cycles,
    /// which are reported separately.
    pub fn unwrap_alias(&self, mut kind_ref: KindRef) -> KindRef {
        for _ in 0..self.slots.len() {
            match self.get(kind_ref) {
                Kind::Custom { target, .. } => kind_ref = *target,
                _ => break,
            }
        }

        kind_ref
    }

    /// The name of a kind or its shape, for diagnostics.
    pub fn describe(&self, kind_ref: KindRef) -> String {
        self.describe_depth(kind_ref, 0)
    }

    fn describe_depth(&self, kind_ref: KindRef, depth: usize) -> String {
        if depth > 8 {
            return "...".to_owned();
        }

        let list = |kinds: &[KindRef]| {
            kinds
                .iter()
                .map(|kind| self.describe_depth(*kind, depth + 1))
                .collect::<Vec<_>>()
                .join(", ")
        };

        match self.get(kind_ref) {
            Kind::Unresolved => "{unknown}".to_owned(),
            Kind::Number => "number".to_owned(),
            Kind::Byte => "byte".to_owned(),
            Kind::Char => "char".to_owned(),
            Kind::String => "string".to_owned(),
            Kind::Bool => "bool".to_owned(),
            Kind::Any => "any".to_owned(),
            Kind::SelfKind => "self".to_owned(),
            Kind::Void => "void".to_owned(),
            Kind::Null => "null".to_owned(),

            Kind::Array {
                element,
                length: Length::Fixed(n),
            } => format!("[{}]{}", n, self.describe_depth(*element, depth + 1)),

            Kind::Array {
                element,
                length: Length::Vector,
            } => format!("[..]{}", self.describe_depth(*element, depth + 1)),

            Kind::Function { params, ret, rest } => {
                let mut res = String::from("fn(");

                for (idx, param) in params.iter().enumerate() {
                    if idx > 0 {
                        res.push_str(", ");
                    }

                    if *rest && idx == params.len() - 1 {
                        res.push_str("..");
                    }

                    res.push_str(&self.describe_depth(*param, depth + 1));
                }

                res.push(')');

                if *ret != VOID {
                    res.push_str(" -> ");
                    res.push_str(&self.describe_depth(*ret, depth + 1));
                }

                res
            },

            Kind::Struct { name: Some(name), .. } => name.clone(),

            Kind::Struct {
                name: None,
                extends,
                props,
                ..
            } => {
                let props = props
                    .iter()
                    .map(|(name, kind)| format!("{}: {}", name, self.describe_depth(*kind, depth + 1)))
                    .collect::<Vec<_>>()
                    .join(", ");

                if extends.is_empty() {
                    format!("struct {{{}}}", props)
                } else {
                    format!("struct<-{} {{{}}}", list(extends), props)
                }
            },

            Kind::Interface { name, .. } | Kind::Enum { name, .. } | Kind::Custom { name, .. } => name.clone(),
        }
    }
}

impl Default for KindArena {
    fn default() -> Self {
        Self::new()
    }
}
