//! Checks on declared kinds, run once every module has been declared.

use ell_log::debug;

use super::{
    kinds::{Kind, KindRef, ANY, SELF},
    module::ModuleId,
    Matcher, Resolver,
};
use crate::errors::{CompileError, DiagnosticsContext, ErrorKind, Span};

impl<'p> Resolver<'p> {
    pub(super) fn verify_kinds(&mut self) -> Result<(), CompileError> {
        debug!("verifying {} kinds", self.kinds.len());

        self.verify_method_targets()?;

        for kind in 0..self.kinds.len() {
            let (module, span) = match self.kinds.slot(kind).origin {
                Some(res) => res,
                None => continue,
            };

            match self.kinds.get(kind).clone() {
                Kind::Custom { name, .. } => {
                    if self.alias_is_cyclic(kind) {
                        return Err(self.error_in(
                            module,
                            ErrorKind::KindMismatch,
                            span,
                            format!("type alias `{}` is defined in terms of itself", name),
                        ));
                    }
                },

                Kind::Struct {
                    name,
                    extends,
                    implements,
                    ..
                } => {
                    let name = name.unwrap_or_default();
                    self.verify_extends(kind, &name, &extends, false, module, span)?;

                    if let Some(interface) = implements {
                        self.verify_implementation(kind, &name, interface, module, span)?;
                    }
                },

                Kind::Interface { name, extends, .. } => {
                    self.verify_extends(kind, &name, &extends, true, module, span)?;
                },

                _ => {},
            }
        }

        Ok(())
    }

    /// Methods can't be attached to `any`, `self` or interfaces.
    fn verify_method_targets(&self) -> Result<(), CompileError> {
        for kind in 0..self.kinds.len() {
            let slot = self.kinds.slot(kind);

            let method = match slot.methods.values().min_by_key(|method| (method.module, method.span.start)) {
                Some(res) => res,
                None => continue,
            };

            let target = self.kinds.unwrap_alias(kind);

            let forbidden = match self.kinds.get(target) {
                Kind::Interface { name, .. } => Some(format!("interface `{}`", name)),
                _ if target == ANY => Some("`any`".to_owned()),
                _ if target == SELF => Some("`self`".to_owned()),
                _ => None,
            };

            if let Some(what) = forbidden {
                let source = self.source_of(method.module);

                return Err(DiagnosticsContext::new(&source)
                    .build_error_span(
                        ErrorKind::ForbiddenImpl,
                        method.span,
                        format!("cannot implement methods for {}", what),
                    )
                    .help("methods may only be attached to concrete types")
                    .build());
            }
        }

        Ok(())
    }

    fn alias_is_cyclic(&self, alias: KindRef) -> bool {
        let mut kind = alias;

        for _ in 0..self.kinds.len() {
            kind = match self.kinds.get(kind) {
                Kind::Custom { target, .. } => *target,
                _ => return false,
            };

            if kind == alias {
                return true;
            }
        }

        // Stuck in a cycle that doesn't contain `alias`, which gets
        // reported for one of its members
        false
    }

    /// Structs may only extend structs and interfaces only interfaces,
    /// without ever reaching themselves.
    fn verify_extends(
        &self,
        kind: KindRef,
        name: &str,
        extends: &[KindRef],
        interface: bool,
        module: ModuleId,
        span: Span,
    ) -> Result<(), CompileError> {
        for base in extends {
            let base = self.kinds.unwrap_alias(*base);

            let allowed = match self.kinds.get(base) {
                Kind::Struct { .. } => !interface,
                Kind::Interface { .. } => interface,
                _ => false,
            };

            if !allowed {
                let expected = if interface { "interfaces" } else { "structs" };

                return Err(self.error_in(
                    module,
                    ErrorKind::KindMismatch,
                    span,
                    format!(
                        "`{}` cannot extend `{}`, only {} may be extended here",
                        name,
                        self.kinds.describe(base),
                        expected
                    ),
                ));
            }
        }

        // Walk the bases looking for `kind`
        let mut visited = Vec::new();
        let mut stack: Vec<KindRef> = extends.to_vec();

        while let Some(base) = stack.pop() {
            let base = self.kinds.unwrap_alias(base);

            if base == kind {
                return Err(self.error_in(
                    module,
                    ErrorKind::KindMismatch,
                    span,
                    format!("`{}` extends itself", name),
                ));
            }

            if visited.contains(&base) {
                continue;
            }

            visited.push(base);

            match self.kinds.get(base) {
                Kind::Struct { extends, .. } | Kind::Interface { extends, .. } => stack.extend(extends),
                _ => {},
            }
        }

        Ok(())
    }

    fn verify_implementation(
        &mut self,
        kind: KindRef,
        name: &str,
        interface: KindRef,
        module: ModuleId,
        span: Span,
    ) -> Result<(), CompileError> {
        let interface = self.kinds.unwrap_alias(interface);

        let interface_name = match self.kinds.get(interface) {
            Kind::Interface { name, .. } => name.clone(),

            _ => {
                return Err(self.error_in(
                    module,
                    ErrorKind::ForbiddenImpl,
                    span,
                    format!("`{}` is not an interface", self.kinds.describe(interface)),
                ))
            },
        };

        // Only methods count, a property holding a function doesn't
        for (prop, expected) in self.kinds.effective_props(interface, module) {
            let method = match self.kinds.lookup_method(kind, &prop).cloned() {
                Some(res) => res,

                None => {
                    let source = self.source_of(module);

                    return Err(DiagnosticsContext::new(&source)
                        .build_error_span(ErrorKind::MissingMethod, span, format!("missing method `{}`", prop))
                        .note(format!(
                            "`{}` implements `{}`, which requires a method `{}: {}`",
                            name,
                            interface_name,
                            prop,
                            self.kinds.describe(expected)
                        ))
                        .build());
                },
            };

            let found = match self.values.get(method.value).kind() {
                Some(res) => res,
                None => continue,
            };

            if !Matcher::new(&self.kinds, module)
                .with_self(Some(kind))
                .matches(expected, found, false)
            {
                let source = self.source_of(method.module);

                return Err(DiagnosticsContext::new(&source)
                    .build_error_span(
                        ErrorKind::KindMismatch,
                        method.span,
                        format!("method `{}` of `{}` doesn't match interface `{}`", prop, name, interface_name),
                    )
                    .note(format!(
                        "expected `{}`, found `{}`",
                        self.kinds.describe(expected),
                        self.kinds.describe(found)
                    ))
                    .build());
            }
        }

        // Implementing an interface also implements everything it extends
        let mut stack = vec![interface];

        while let Some(interface) = stack.pop() {
            let interface = self.kinds.unwrap_alias(interface);

            if self.kinds.refs(interface).contains(&kind) {
                continue;
            }

            self.kinds.add_ref(interface, kind);

            if let Kind::Interface { extends, .. } = self.kinds.get(interface) {
                stack.extend(extends);
            }
        }

        debug!("`{}` implements `{}`", name, interface_name);
        Ok(())
    }
}
