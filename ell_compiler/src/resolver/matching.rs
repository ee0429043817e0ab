//! Structural kind matching and the queries it's built on.

use super::{
    kinds::{Kind, KindArena, KindRef, Method, SELF},
    module::ModuleId,
};

impl KindArena {
    /// The flattened properties of a struct or interface.
    ///
    /// A kind's own properties win over inherited ones, and a base listed
    /// later in `extends` wins over one listed earlier. Properties whose
    /// name starts with `_` are left out unless `inspector` is the module
    /// that declared the struct.
    pub fn effective_props(&self, kind: KindRef, inspector: ModuleId) -> Vec<(String, KindRef)> {
        let mut res = Vec::new();
        let mut visited = Vec::new();
        self.collect_props(kind, inspector, &mut res, &mut visited);
        res
    }

    fn collect_props(
        &self,
        kind: KindRef,
        inspector: ModuleId,
        res: &mut Vec<(String, KindRef)>,
        visited: &mut Vec<KindRef>,
    ) {
        let kind = self.unwrap_alias(kind);

        // Only `extends` is followed, so this terminates even on cycles
        if visited.contains(&kind) {
            return;
        }

        visited.push(kind);

        let (props, extends, owner) = match self.get(kind) {
            Kind::Struct {
                props,
                extends,
                module,
                ..
            } => (props, extends, Some(*module)),

            Kind::Interface { props, extends, .. } => (props, extends, None),
            _ => return,
        };

        for (name, prop) in props {
            let hidden = name.starts_with('_') && owner.map_or(false, |owner| owner != inspector);

            if !hidden && !res.iter().any(|(existing, _)| existing == name) {
                res.push((name.clone(), *prop));
            }
        }

        for base in extends.iter().rev() {
            self.collect_props(*base, inspector, res, visited);
        }
    }

    /// Finds a method of `kind`, looking through aliases and struct bases.
    pub fn lookup_method(&self, kind: KindRef, name: &str) -> Option<&Method> {
        let mut visited = Vec::new();
        self.lookup_method_inner(kind, name, &mut visited)
    }

    fn lookup_method_inner(&self, kind: KindRef, name: &str, visited: &mut Vec<KindRef>) -> Option<&Method> {
        if visited.contains(&kind) {
            return None;
        }

        visited.push(kind);

        if let Some(method) = self.slot(kind).methods.get(name) {
            return Some(method);
        }

        match self.get(kind) {
            Kind::Custom { target, .. } => self.lookup_method_inner(*target, name, visited),

            Kind::Struct { extends, .. } => extends
                .iter()
                .rev()
                .find_map(|base| self.lookup_method_inner(*base, name, visited)),

            _ => None,
        }
    }

    /// Returns `true` if `kind` mentions the `self` placeholder.
    pub fn contains_self(&self, kind: KindRef) -> bool {
        match self.get(kind) {
            Kind::SelfKind => true,
            Kind::Array { element, .. } => self.contains_self(*element),

            Kind::Function { params, ret, .. } => {
                params.iter().any(|param| self.contains_self(*param)) || self.contains_self(*ret)
            },

            _ => false,
        }
    }

    /// Returns `kind` with the `self` placeholder replaced by `target`.
    /// The original kind is left untouched.
    pub fn substitute_self(&mut self, kind: KindRef, target: KindRef) -> KindRef {
        if !self.contains_self(kind) {
            return kind;
        }

        match self.get(kind).clone() {
            Kind::SelfKind => target,

            Kind::Array { element, length } => {
                let element = self.substitute_self(element, target);
                self.add(Kind::Array { element, length })
            },

            Kind::Function { params, ret, rest } => {
                let params = params
                    .into_iter()
                    .map(|param| self.substitute_self(param, target))
                    .collect();
                let ret = self.substitute_self(ret, target);

                self.add(Kind::Function { params, ret, rest })
            },

            _ => kind,
        }
    }
}

/// Decides whether a value of one kind may be used where another is
/// expected.
#[derive(Clone, Copy, Debug)]
pub struct Matcher<'a> {
    kinds: &'a KindArena,
    inspector: ModuleId,
    self_kind: Option<KindRef>,
}

impl<'a> Matcher<'a> {
    /// `inspector` is the module doing the matching, which decides
    /// whether private struct properties take part.
    pub fn new(kinds: &'a KindArena, inspector: ModuleId) -> Self {
        Self {
            kinds,
            inspector,
            self_kind: None,
        }
    }

    /// Substitutes `self_kind` for the `self` placeholder on both sides.
    pub fn with_self(mut self, self_kind: Option<KindRef>) -> Self {
        self.self_kind = self_kind;
        self
    }

    /// With `loose` set, a struct may be matched by one with fewer
    /// properties.
    pub fn matches(&self, expected: KindRef, received: KindRef, loose: bool) -> bool {
        let mut assumed = Vec::new();
        self.matches_inner(expected, received, loose, &mut assumed)
    }

    fn resolve(&self, mut kind: KindRef) -> KindRef {
        for _ in 0..2 {
            if kind == SELF {
                kind = self.self_kind.unwrap_or(SELF);
            }

            kind = self.kinds.unwrap_alias(kind);
        }

        kind
    }

    fn matches_inner(
        &self,
        expected: KindRef,
        received: KindRef,
        loose: bool,
        assumed: &mut Vec<(KindRef, KindRef)>,
    ) -> bool {
        let expected = self.resolve(expected);
        let received = self.resolve(received);

        if expected == received {
            return true;
        }

        match (self.kinds.get(expected), self.kinds.get(received)) {
            (Kind::Any, _) | (_, Kind::Any) | (Kind::Null, _) | (_, Kind::Null) => true,

            (
                Kind::Array {
                    element: expected_element,
                    length: expected_length,
                },
                Kind::Array {
                    element: received_element,
                    length: received_length,
                },
            ) => {
                expected_length == received_length
                    && self.matches_inner(*expected_element, *received_element, false, assumed)
            },

            (
                Kind::Function {
                    params: expected_params,
                    ret: expected_ret,
                    rest: expected_rest,
                },
                Kind::Function {
                    params: received_params,
                    ret: received_ret,
                    rest: received_rest,
                },
            ) => {
                expected_rest == received_rest
                    && expected_params.len() == received_params.len()
                    && expected_params
                        .iter()
                        .zip(received_params)
                        .all(|(e, r)| self.matches_inner(*e, *r, false, assumed))
                    && self.matches_inner(*expected_ret, *received_ret, false, assumed)
            },

            (Kind::Struct { .. }, Kind::Struct { .. }) | (Kind::Interface { .. }, Kind::Interface { .. }) => {
                // Recursive kinds are assumed to match while their
                // properties are being compared
                if assumed.contains(&(expected, received)) {
                    return true;
                }

                assumed.push((expected, received));

                let structs = matches!(self.kinds.get(expected), Kind::Struct { .. });
                let expected_props = self.kinds.effective_props(expected, self.inspector);
                let received_props = self.kinds.effective_props(received, self.inspector);

                if (!loose || !structs) && expected_props.len() != received_props.len() {
                    return false;
                }

                received_props.iter().all(|(name, received_prop)| {
                    expected_props
                        .iter()
                        .find(|(expected_name, _)| expected_name == name)
                        .map_or(false, |(_, expected_prop)| {
                            self.matches_inner(*expected_prop, *received_prop, false, assumed)
                        })
                })
            },

            (Kind::Interface { .. }, _) => self.kinds.refs(expected).contains(&received),

            _ => false,
        }
    }
}
