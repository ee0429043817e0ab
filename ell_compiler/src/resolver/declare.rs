//! Pass 1: declaring the names of a module.

use std::{mem, rc::Rc};

use ell_log::{debug, trace};

use super::{
    kinds::{Kind, KindArena, KindRef, Method, UNRESOLVED},
    module::{normalize_path, Module, ModuleId, ModuleState},
    values::Value,
    Resolver,
};
use crate::{
    errors::{CompileError, DiagnosticsContext, ErrorKind, SourceBuffer},
    parser::{
        self,
        ast::{
            ArrayLength, FunctionDecl, Ident, Import, KindExpr, KindExprKind, StatementKind, TypeBody,
            TypeDecl, VariableDecl,
        },
    },
};

impl<'p> Resolver<'p> {
    /// Parses a module and runs pass 1 over it, loading its imports on the
    /// way.
    pub(super) fn load_module(&mut self, path: String, source: SourceBuffer) -> Result<ModuleId, CompileError> {
        trace!("parsing `{}`", path);
        let ast = parser::parse(&source)?;

        let id = self.modules.insert(Module::new(path, source, ast));
        let importer = mem::replace(&mut self.current, id);

        debug!("declaring `{}`", self.module().path);
        let res = self.declare_module();
        self.current = importer;
        res?;

        self.modules.get_mut(id).state = ModuleState::Declared;
        self.order.push(id);
        Ok(id)
    }

    fn declare_module(&mut self) -> Result<(), CompileError> {
        let ast = Rc::clone(&self.module().ast);

        // Placeholders first, so kinds may refer to each other in any order
        let mut declared_kinds = Vec::new();

        for statement in &ast.statements {
            if let StatementKind::Type(decl) = &statement.kind {
                let kind = self.declare_kind(decl)?;
                declared_kinds.push((decl, kind));
            }
        }

        for statement in &ast.statements {
            if let StatementKind::Import(import) = &statement.kind {
                self.declare_import(import)?;
            }
        }

        for (decl, kind) in declared_kinds {
            self.define_kind(decl, kind)?;
        }

        for statement in &ast.statements {
            match &statement.kind {
                StatementKind::Function(function) => self.declare_function(function)?,

                StatementKind::Impl(block) => {
                    for method in &block.methods {
                        self.declare_method(&block.target, method)?;
                    }
                },

                StatementKind::Variable(variable) => self.declare_global(variable)?,
                _ => {},
            }
        }

        Ok(())
    }

    fn declare_kind(&mut self, decl: &TypeDecl) -> Result<KindRef, CompileError> {
        let name = &decl.name;

        if KindArena::builtin(&name.name).is_some() {
            return Err(self.error(
                ErrorKind::ReservedTypeDeclared,
                name.span,
                format!("`{}` is a built-in type and cannot be redeclared", name),
            ));
        }

        let kind = self.kinds.declare(self.current, name.span);

        if self.module_mut().scopes.set_kind(name.name.clone(), kind).is_err() {
            return Err(self.error(
                ErrorKind::DuplicateName,
                name.span,
                format!("type `{}` is declared more than once", name),
            ));
        }

        if decl.public {
            let _ = self.module_mut().public.set_kind(name.name.clone(), kind);
        }

        trace!("declared type `{}` as #{}", name, kind);
        Ok(kind)
    }

    fn declare_import(&mut self, import: &Import) -> Result<(), CompileError> {
        let path = normalize_path(&self.module().path, &import.path);

        let module = match self.modules.find(&path) {
            Some(module) => {
                if self.modules.get(module).state == ModuleState::Declaring {
                    debug!("importing `{}` from `{}` closes a cycle", path, self.module().path);
                    self.mark_cycle(module, &import.alias.name);
                }

                module
            },

            None => self.load_import(path, import)?,
        };

        let value = self.values.add(Value::Module {
            name: import.alias.name.clone(),
            module,
        });

        self.bind_value(&import.alias, value)
    }

    fn load_import(&mut self, path: String, import: &Import) -> Result<ModuleId, CompileError> {
        let source = self.source_of(self.current);
        let error_ctx = DiagnosticsContext::new(&source);

        if self.imports.len() >= self.options.max_import_depth {
            return Err(error_ctx
                .build_error_span(
                    ErrorKind::ImportCycle,
                    import.path_span,
                    format!("imports are nested more than {} modules deep", self.options.max_import_depth),
                )
                .help("the limit can be raised with `-Z import-depth=N`")
                .build());
        }

        let code = match self.provider.read(&path) {
            Ok(res) => res,

            Err(e) => {
                return Err(error_ctx
                    .build_error_span(
                        ErrorKind::PathNotFound,
                        import.path_span,
                        format!("cannot find module `{}`", import.path),
                    )
                    .note(e)
                    .build())
            },
        };

        self.imports.push((self.current, import.alias.name.clone()));
        let res = self.load_module(path.clone(), SourceBuffer::new(code, Some(path)));
        self.imports.pop();
        res
    }

    /// Importing `target` while it is still being declared closes a cycle
    /// running from `target` down the pending imports to the current
    /// module. Every import along it is marked on its importer.
    fn mark_cycle(&mut self, target: ModuleId, alias: &str) {
        let start = self
            .imports
            .iter()
            .position(|(importer, _)| *importer == target)
            .unwrap_or(self.imports.len());

        for (importer, edge) in self.imports[start..].to_vec() {
            trace!("`{}` of `{}` is part of the cycle", edge, self.modules.get(importer).path);
            self.modules.get_mut(importer).cyclic.insert(edge);
        }

        self.module_mut().cyclic.insert(alias.to_owned());
    }

    fn define_kind(&mut self, decl: &TypeDecl, kind: KindRef) -> Result<(), CompileError> {
        let name = decl.name.name.clone();

        let definition = match &decl.body {
            TypeBody::Alias(target) => Kind::Custom {
                name,
                target: self.resolve_kind_expr(target)?,
            },

            TypeBody::Enum(choices) => {
                let mut names: Vec<String> = Vec::with_capacity(choices.len());

                for choice in choices {
                    if names.contains(&choice.name) {
                        return Err(self.error(
                            ErrorKind::DuplicateName,
                            choice.span,
                            format!("enum `{}` lists `{}` more than once", decl.name, choice),
                        ));
                    }

                    names.push(choice.name.clone());
                }

                Kind::Enum { name, choices: names }
            },

            TypeBody::Struct {
                implements,
                extends,
                props,
            } => {
                let implements = match implements {
                    Some(interface) => Some(self.resolve_kind_expr(interface)?),
                    None => None,
                };

                let extends = extends
                    .iter()
                    .map(|base| self.resolve_kind_expr(base))
                    .collect::<Result<Vec<_>, _>>()?;

                Kind::Struct {
                    name: Some(name),
                    extends,
                    props: self.resolve_props(props)?,
                    implements,
                    module: self.current,
                }
            },

            TypeBody::Interface { extends, props } => {
                let extends = extends
                    .iter()
                    .map(|base| self.resolve_kind_expr(base))
                    .collect::<Result<Vec<_>, _>>()?;

                Kind::Interface {
                    name,
                    extends,
                    props: self.resolve_props(props)?,
                }
            },
        };

        self.kinds.define(kind, definition);
        Ok(())
    }

    fn declare_function(&mut self, function: &FunctionDecl) -> Result<(), CompileError> {
        if let Some(target) = &function.target {
            return self.declare_method(target, function);
        }

        let kind = self.resolve_signature(&function.signature)?;
        let value = self.values.add(Value::Function {
            name: function.name.name.clone(),
            kind,
        });

        self.bind_top_level_value(&function.name, value, function.public)?;
        self.module_mut().declared.insert(function.name.span, value);
        Ok(())
    }

    /// Adds a method to the method table of `target`.
    fn declare_method(&mut self, target: &Ident, function: &FunctionDecl) -> Result<(), CompileError> {
        let target_kind = self.find_kind(&target.name).ok_or_else(|| {
            self.error(
                ErrorKind::UnknownName,
                target.span,
                format!("cannot find type `{}` in this scope", target),
            )
        })?;

        let kind = self.resolve_signature(&function.signature)?;
        let name = &function.name;
        let value = self.values.add(Value::Function {
            name: name.name.clone(),
            kind,
        });

        let method = Method {
            value,
            module: self.current,
            span: name.span,
        };

        let slot = self.kinds.slot_mut(target_kind);

        if slot.methods.contains_key(&name.name) {
            return Err(self.error(
                ErrorKind::DuplicateName,
                name.span,
                format!("method `{}` is already defined for `{}`", name, target),
            ));
        }

        slot.methods.insert(name.name.clone(), method);
        self.module_mut().declared.insert(name.span, value);

        trace!("declared method `{}.{}`", target, name);
        Ok(())
    }

    /// Top-level variables get their declared kind now. Those relying on
    /// their initializer are filled in during pass 2.
    fn declare_global(&mut self, variable: &VariableDecl) -> Result<(), CompileError> {
        let kind = match &variable.kind {
            Some(KindExpr {
                kind: KindExprKind::Array(_, ArrayLength::Inferred),
                ..
            })
            | None => UNRESOLVED,

            Some(kind) => self.resolve_kind_expr(kind)?,
        };

        let value = self.values.add(Value::Variable {
            name: variable.name.name.clone(),
            kind,
            constant: variable.constant,
        });

        self.bind_top_level_value(&variable.name, value, variable.public)?;
        self.module_mut().declared.insert(variable.name.span, value);
        Ok(())
    }
}
