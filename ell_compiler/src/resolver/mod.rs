//! Name resolution and type checking.
//!
//! Every module goes through two passes. Pass 1 declares the module's
//! names: kinds first (as placeholders, so they may refer to each other
//! and to kinds of modules further up an import cycle), then imports,
//! then kind definitions, then functions, methods and variables. Once
//! every module has been declared, kinds are verified (alias cycles,
//! `extends` lists, interface implementations) and pass 2 checks
//! function bodies and initializers, dependencies first.

mod check;
mod declare;
mod infer;
pub mod kinds;
mod matching;
pub mod module;
pub mod scopes;
pub mod values;
mod verify;


use std::rc::Rc;

use ell_log::debug;

use self::{
    kinds::{Kind, KindArena, KindRef, Length, ANY, SELF, VOID},
    module::{normalize_path, FileProvider, Module, ModuleId, ModuleMap},
    values::{Value, ValueArena, ValueRef},
};
pub use self::matching::Matcher;
use crate::{
    errors::{CompileError, DiagnosticsContext, ErrorKind, SourceBuffer, Span},
    options::CompileOptions,
    parser::ast::{ArrayLength, FunctionSignature, Ident, KindExpr, KindExprKind, Property},
};

/// Everything a finished compilation knows about the program.
#[derive(Debug)]
pub struct Compilation {
    pub kinds: KindArena,
    pub values: ValueArena,
    pub modules: ModuleMap,
    root: ModuleId,
}

impl Compilation {
    pub fn root_id(&self) -> ModuleId {
        self.root
    }

    pub fn root(&self) -> &Module {
        self.modules.get(self.root)
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        self.modules.get(id)
    }

    /// Looks up a top-level value of a module.
    pub fn find_value(&self, module: ModuleId, name: &str) -> Option<&Value> {
        self.module(module)
            .scope()
            .value(name)
            .map(|value| self.values.get(value))
    }

    /// Looks up a top-level kind of a module.
    pub fn find_kind(&self, module: ModuleId, name: &str) -> Option<KindRef> {
        self.module(module).scope().kind(name)
    }

    pub fn describe(&self, kind: KindRef) -> String {
        self.kinds.describe(kind)
    }
}

/// Per-function state of pass 2.
#[derive(Clone, Debug)]
struct FunctionContext {
    ret: KindRef,
    self_kind: Option<KindRef>,
}

impl FunctionContext {
    const fn top_level() -> Self {
        Self {
            ret: VOID,
            self_kind: None,
        }
    }
}

pub(crate) struct Resolver<'p> {
    provider: &'p dyn FileProvider,
    options: CompileOptions,
    kinds: KindArena,
    values: ValueArena,
    modules: ModuleMap,
    /// Modules in the order they finished pass 1. Imported modules come
    /// before their importers, except along cycles.
    order: Vec<ModuleId>,
    /// The module being worked on.
    current: ModuleId,
    /// Imports being loaded as `(importer, alias)`, outermost first.
    imports: Vec<(ModuleId, String)>,
    functions: Vec<FunctionContext>,
}

impl<'p> Resolver<'p> {
    pub(crate) fn new(provider: &'p dyn FileProvider, options: CompileOptions) -> Self {
        Self {
            provider,
            options,
            kinds: KindArena::new(),
            values: ValueArena::new(),
            modules: ModuleMap::new(),
            order: Vec::new(),
            current: 0,
            imports: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Compiles the module at `path`, whose source is `code`, and
    /// everything it imports.
    pub(crate) fn compile(mut self, code: &str, path: &str) -> Result<Compilation, CompileError> {
        let path = normalize_path("", path);
        let source = SourceBuffer::new(code, Some(path.clone()));
        let root = self.load_module(path, source)?;

        self.verify_kinds()?;

        if self.options.check_bodies {
            self.check_modules()?;
        } else {
            debug!("skipping pass 2");
        }

        Ok(Compilation {
            kinds: self.kinds,
            values: self.values,
            modules: self.modules,
            root,
        })
    }

    fn module(&self) -> &Module {
        self.modules.get(self.current)
    }

    fn module_mut(&mut self) -> &mut Module {
        self.modules.get_mut(self.current)
    }

    fn source_of(&self, module: ModuleId) -> Rc<SourceBuffer> {
        Rc::clone(&self.modules.get(module).source)
    }

    fn error(&self, kind: ErrorKind, span: Span, message: impl ToString) -> CompileError {
        self.error_in(self.current, kind, span, message)
    }

    fn error_in(&self, module: ModuleId, kind: ErrorKind, span: Span, message: impl ToString) -> CompileError {
        let source = self.source_of(module);
        DiagnosticsContext::new(&source).error(kind, span, message)
    }

    fn mismatch(&self, expected: KindRef, received: KindRef, span: Span) -> CompileError {
        self.error(
            ErrorKind::KindMismatch,
            span,
            format!(
                "mismatched types: expected `{}`, found `{}`",
                self.kinds.describe(expected),
                self.kinds.describe(received)
            ),
        )
    }

    fn function(&self) -> Option<&FunctionContext> {
        self.functions.last()
    }

    fn self_kind(&self) -> Option<KindRef> {
        self.function().and_then(|function| function.self_kind)
    }

    fn matcher(&self) -> Matcher<'_> {
        Matcher::new(&self.kinds, self.current).with_self(self.self_kind())
    }

    fn matches(&self, expected: KindRef, received: KindRef, loose: bool) -> bool {
        self.matcher().matches(expected, received, loose)
    }

    /// Follows aliases and the `self` placeholder.
    fn unwrap(&self, kind: KindRef) -> KindRef {
        let kind = match (kind, self.self_kind()) {
            (SELF, Some(target)) => target,
            _ => kind,
        };

        self.kinds.unwrap_alias(kind)
    }

    fn find_value(&self, name: &str) -> Option<ValueRef> {
        self.module().scopes.find_value(name)
    }

    fn find_kind(&self, name: &str) -> Option<KindRef> {
        self.module()
            .scopes
            .find_kind(name)
            .or_else(|| KindArena::builtin(name))
    }

    /// Binds a value in the innermost scope.
    fn bind_value(&mut self, name: &Ident, value: ValueRef) -> Result<(), CompileError> {
        match self.module_mut().scopes.set_value(name.name.clone(), value) {
            Ok(()) => Ok(()),
            Err(_) => Err(self.error(
                ErrorKind::DuplicateName,
                name.span,
                format!("`{}` is already declared in this scope", name),
            )),
        }
    }

    /// Binds a top-level value, and exports it if it's public.
    fn bind_top_level_value(&mut self, name: &Ident, value: ValueRef, public: bool) -> Result<(), CompileError> {
        self.bind_value(name, value)?;

        if public {
            // Can't clash, the module scope would've caught it
            let _ = self.module_mut().public.set_value(name.name.clone(), value);
        }

        Ok(())
    }

    /// Resolves a module alias used as the first segment of a path.
    fn find_module(&self, name: &str) -> Option<ModuleId> {
        match self.find_value(name).map(|value| self.values.get(value)) {
            Some(Value::Module { module, .. }) => Some(*module),
            _ => None,
        }
    }

    /// Checks that `name` may be accessed from outside `module`.
    fn check_visibility(&self, module: ModuleId, name: &Ident) -> Result<(), CompileError> {
        if name.is_private() {
            return Err(self.error(
                ErrorKind::PrivateAccess,
                name.span,
                format!("`{}` is private to module `{}`", name, self.modules.get(module).path),
            ));
        }

        Ok(())
    }

    /// A public kind of another module.
    fn module_kind(&self, module: ModuleId, name: &Ident) -> Result<KindRef, CompileError> {
        self.check_visibility(module, name)?;

        self.modules.get(module).public.kind(&name.name).ok_or_else(|| {
            self.error(
                ErrorKind::UnknownName,
                name.span,
                format!(
                    "module `{}` has no public type `{}`",
                    self.modules.get(module).path,
                    name
                ),
            )
        })
    }

    /// A public value of another module, reached through the import
    /// alias `alias`.
    fn module_value(&self, module: ModuleId, alias: &str, name: &Ident) -> Result<ValueRef, CompileError> {
        self.check_visibility(module, name)?;

        let value = match self.modules.get(module).public.value(&name.name) {
            Some(res) => res,

            None => {
                return Err(self.error(
                    ErrorKind::UnknownName,
                    name.span,
                    format!(
                        "module `{}` has no public value `{}`",
                        self.modules.get(module).path,
                        name
                    ),
                ))
            },
        };

        if self.module().cyclic.contains(alias) {
            let source = self.source_of(self.current);

            return Err(DiagnosticsContext::new(&source)
                .build_error_span(
                    ErrorKind::ImportCycle,
                    name.span,
                    format!("cannot use `{}` here, the import of `{}` forms a cycle", name, alias),
                )
                .help("only types may be used through an import cycle")
                .build());
        }

        Ok(value)
    }

    /// Resolves type syntax.
    fn resolve_kind_expr(&mut self, kind_expr: &KindExpr) -> Result<KindRef, CompileError> {
        match &kind_expr.kind {
            KindExprKind::Primitive(primitive) => {
                KindArena::builtin(primitive.as_str()).ok_or_else(|| {
                    self.error(ErrorKind::Internal, kind_expr.span, "unknown primitive type")
                })
            },

            KindExprKind::SelfKind => Ok(self.self_kind().unwrap_or(SELF)),

            KindExprKind::Array(element, length) => {
                let length = match length {
                    ArrayLength::Fixed(n) => Length::Fixed(*n),
                    ArrayLength::Vector => Length::Vector,

                    ArrayLength::Inferred => {
                        return Err(self.error(
                            ErrorKind::KindMismatch,
                            kind_expr.span,
                            "arrays of inferred length need an initializer",
                        ))
                    },
                };

                let element = self.resolve_kind_expr(element)?;
                Ok(self.kinds.add(Kind::Array { element, length }))
            },

            KindExprKind::Identifier(name) => self.find_kind(name).ok_or_else(|| {
                self.error(
                    ErrorKind::UnknownName,
                    kind_expr.span,
                    format!("cannot find type `{}` in this scope", name),
                )
            }),

            KindExprKind::Member(path) => {
                let (first, rest) = match path.split_first() {
                    Some(res) => res,
                    None => return Err(self.error(ErrorKind::Internal, kind_expr.span, "empty type path")),
                };

                let mut module = self.find_module(&first.name).ok_or_else(|| {
                    self.error(
                        ErrorKind::UnknownName,
                        first.span,
                        format!("`{}` is not an imported module", first),
                    )
                })?;

                let (last, middle) = match rest.split_last() {
                    Some(res) => res,
                    None => return Err(self.error(ErrorKind::Internal, kind_expr.span, "empty type path")),
                };

                for segment in middle {
                    self.check_visibility(module, segment)?;

                    module = match self.modules.get(module).public.value(&segment.name) {
                        Some(value) => match self.values.get(value) {
                            Value::Module { module, .. } => *module,
                            _ => {
                                return Err(self.error(
                                    ErrorKind::UnknownName,
                                    segment.span,
                                    format!("`{}` is not a module", segment),
                                ))
                            },
                        },

                        None => {
                            return Err(self.error(
                                ErrorKind::UnknownName,
                                segment.span,
                                format!("`{}` is not a module", segment),
                            ))
                        },
                    };
                }

                self.module_kind(module, last)
            },

            KindExprKind::Function(signature) => self.resolve_signature(signature),

            KindExprKind::Struct { extends, props } => {
                let extends = extends
                    .iter()
                    .map(|base| self.resolve_kind_expr(base))
                    .collect::<Result<Vec<_>, _>>()?;
                let props = self.resolve_props(props)?;

                Ok(self.kinds.add(Kind::Struct {
                    name: None,
                    extends,
                    props,
                    implements: None,
                    module: self.current,
                }))
            },
        }
    }

    /// Builds a function kind. Functions without `->` return `void`.
    fn resolve_signature(&mut self, signature: &FunctionSignature) -> Result<KindRef, CompileError> {
        let mut params = Vec::with_capacity(signature.params.len());

        for param in &signature.params {
            let kind = self.resolve_kind_expr(&param.kind)?;

            if param.rest && !self.is_vector(kind) {
                let source = self.source_of(self.current);

                return Err(DiagnosticsContext::new(&source)
                    .build_error_span(
                        ErrorKind::KindMismatch,
                        param.kind.span,
                        "rest parameters must be vectors",
                    )
                    .help(format!("try `[..]{}`", param.kind))
                    .build());
            }

            params.push(kind);
        }

        let ret = match &signature.ret {
            Some(ret) => self.resolve_kind_expr(ret)?,
            None => VOID,
        };

        Ok(self.kinds.add(Kind::Function {
            params,
            ret,
            rest: signature.has_rest(),
        }))
    }

    /// Resolves struct or interface properties, rejecting duplicates.
    fn resolve_props(
        &mut self,
        props: &[Property],
    ) -> Result<Vec<(String, KindRef)>, CompileError> {
        let mut res: Vec<(String, KindRef)> = Vec::with_capacity(props.len());

        for prop in props {
            if res.iter().any(|(name, _)| *name == prop.name.name) {
                return Err(self.error(
                    ErrorKind::DuplicateName,
                    prop.name.span,
                    format!("property `{}` is declared twice", prop.name),
                ));
            }

            let kind = self.resolve_kind_expr(&prop.kind)?;
            res.push((prop.name.name.clone(), kind));
        }

        Ok(res)
    }

    fn is_vector(&self, kind: KindRef) -> bool {
        matches!(
            self.kinds.get(self.kinds.unwrap_alias(kind)),
            Kind::Array {
                length: Length::Vector,
                ..
            }
        ) || self.kinds.unwrap_alias(kind) == ANY
    }
}
