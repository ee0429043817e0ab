//! Pass 2: checking function bodies and top-level code.

use std::rc::Rc;

use ell_log::{debug, trace};

use super::{
    kinds::{Kind, KindRef, Length, ANY, BOOL, CHAR, NULL, NUMBER, UNRESOLVED, VOID},
    module::ModuleState,
    values::Value,
    FunctionContext, Resolver,
};
use crate::{
    errors::{CompileError, DiagnosticsContext, ErrorKind},
    parser::ast::{
        ArrayLength, Block, ForKind, ForStatement, FunctionDecl, FunctionSignature, Ident,
        IfStatement, KindExpr, KindExprKind, Script, Statement, StatementKind, VariableDecl,
    },
};

impl<'p> Resolver<'p> {
    /// Runs pass 2 over every module, imported modules first.
    pub(super) fn check_modules(&mut self) -> Result<(), CompileError> {
        for module in self.order.clone() {
            self.current = module;
            debug!("checking `{}`", self.module().path);

            let ast = Rc::clone(&self.module().ast);
            self.functions.push(FunctionContext::top_level());
            let res = self.check_script(&ast);
            self.functions.pop();
            res?;

            self.module_mut().state = ModuleState::Checked;
        }

        Ok(())
    }

    /// Top-level code runs first, in source order. Function bodies are
    /// checked afterwards so they can use every global.
    fn check_script(&mut self, script: &Script) -> Result<(), CompileError> {
        for statement in &script.statements {
            match &statement.kind {
                StatementKind::Import(_)
                | StatementKind::Type(_)
                | StatementKind::Function(_)
                | StatementKind::Impl(_) => {},

                StatementKind::Variable(variable) => self.check_global(variable)?,
                _ => self.check_statement(statement)?,
            }
        }

        for statement in &script.statements {
            match &statement.kind {
                StatementKind::Function(function) => self.check_function_decl(function, function.target.as_ref())?,

                StatementKind::Impl(block) => {
                    for method in &block.methods {
                        self.check_function_decl(method, Some(&block.target))?;
                    }
                },

                _ => {},
            }
        }

        Ok(())
    }

    fn check_global(&mut self, variable: &VariableDecl) -> Result<(), CompileError> {
        let value = match self.module().declared.get(&variable.name.span) {
            Some(res) => *res,
            None => return Err(self.error(ErrorKind::Internal, variable.name.span, "undeclared global")),
        };

        let declared = self.values.get(value).kind().filter(|kind| *kind != UNRESOLVED);
        let kind = self.variable_kind(variable, declared)?;

        if let Value::Variable { kind: slot, .. } = self.values.get_mut(value) {
            *slot = kind;
        }

        trace!("global `{}` is `{}`", variable.name, self.kinds.describe(kind));
        Ok(())
    }

    fn check_function_decl(&mut self, function: &FunctionDecl, target: Option<&Ident>) -> Result<(), CompileError> {
        let kind = self
            .module()
            .declared
            .get(&function.name.span)
            .and_then(|value| self.values.get(*value).kind());

        let kind = match kind {
            Some(res) => res,
            None => return Err(self.error(ErrorKind::Internal, function.name.span, "undeclared function")),
        };

        let self_kind = match target {
            Some(target) => match self.find_kind(&target.name) {
                Some(res) => Some(res),
                None => return Err(self.error(ErrorKind::Internal, target.span, "unknown method target")),
            },

            None => None,
        };

        trace!("checking body of `{}`", function.name);
        self.check_function_body(kind, self_kind, &function.signature, &function.body)
    }

    /// Checks a function body in a fresh scope holding its parameters,
    /// and `self` for methods.
    pub(super) fn check_function_body(
        &mut self,
        kind: KindRef,
        self_kind: Option<KindRef>,
        signature: &FunctionSignature,
        body: &Block,
    ) -> Result<(), CompileError> {
        let (params, ret) = match self.kinds.get(kind).clone() {
            Kind::Function { params, ret, .. } => (params, ret),
            _ => return Err(self.error(ErrorKind::Internal, signature.span, "function without a function kind")),
        };

        let (params, ret): (Vec<KindRef>, KindRef) = match self_kind {
            Some(target) => (
                params
                    .into_iter()
                    .map(|param| self.kinds.substitute_self(param, target))
                    .collect(),
                self.kinds.substitute_self(ret, target),
            ),

            None => (params, ret),
        };

        self.functions.push(FunctionContext { ret, self_kind });
        self.module_mut().scopes.push();

        let res = self.bind_params(self_kind, signature, &params).and_then(|()| {
            body.statements
                .iter()
                .try_for_each(|statement| self.check_statement(statement))
        });

        self.module_mut().scopes.pop();
        self.functions.pop();
        res
    }

    fn bind_params(
        &mut self,
        self_kind: Option<KindRef>,
        signature: &FunctionSignature,
        params: &[KindRef],
    ) -> Result<(), CompileError> {
        if let Some(kind) = self_kind {
            let value = self.values.add(Value::SelfValue { kind });
            let _ = self.module_mut().scopes.set_value("self", value);
        }

        for (param, kind) in signature.params.iter().zip(params) {
            if let Some(name) = &param.name {
                self.bind_variable(name, *kind, false)?;
            }
        }

        Ok(())
    }

    fn bind_variable(&mut self, name: &Ident, kind: KindRef, constant: bool) -> Result<(), CompileError> {
        let value = self.values.add(Value::Variable {
            name: name.name.clone(),
            kind,
            constant,
        });

        self.bind_value(name, value)
    }

    fn check_block(&mut self, block: &Block) -> Result<(), CompileError> {
        self.module_mut().scopes.push();

        let res = block
            .statements
            .iter()
            .try_for_each(|statement| self.check_statement(statement));

        self.module_mut().scopes.pop();
        res
    }

    fn check_statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match &statement.kind {
            StatementKind::Variable(variable) => {
                let kind = self.variable_kind(variable, None)?;
                self.bind_variable(&variable.name, kind, variable.constant)
            },

            StatementKind::Block(block) => self.check_block(block),

            StatementKind::Return(value) => {
                let ret = self.function().map_or(VOID, |function| function.ret);

                match value {
                    Some(value) => self.check_expression(value, ret).map(|_| ()),
                    None if ret == VOID => Ok(()),
                    None => Err(self.mismatch(ret, VOID, statement.span)),
                }
            },

            StatementKind::If(IfStatement {
                cond,
                then,
                otherwise,
            }) => {
                self.check_expression(cond, BOOL)?;
                self.check_block(then)?;

                match otherwise {
                    Some(otherwise) => self.check_statement(otherwise),
                    None => Ok(()),
                }
            },

            StatementKind::For(ForStatement { kind, body, .. }) => {
                self.module_mut().scopes.push();
                let res = self.check_for(kind, body);
                self.module_mut().scopes.pop();
                res
            },

            // Labels were matched to their loops while parsing
            StatementKind::Break(_) | StatementKind::Continue(_) => Ok(()),

            StatementKind::Expression(expr) => self.infer(expr, None).map(|_| ()),

            // Only allowed at the top level, where pass 1 took care of them
            StatementKind::Import(_) | StatementKind::Function(_) | StatementKind::Type(_) | StatementKind::Impl(_) => {
                Ok(())
            },
        }
    }

    /// Checks a loop header and body. The header's bindings live in a
    /// scope pushed by the caller.
    fn check_for(&mut self, kind: &ForKind, body: &Block) -> Result<(), CompileError> {
        match kind {
            ForKind::Infinite => {},

            ForKind::While(cond) => {
                self.check_expression(cond, BOOL)?;
            },

            ForKind::CStyle { init, cond, update } => {
                if let Some(init) = init {
                    self.check_statement(init)?;
                }

                if let Some(cond) = cond {
                    self.check_expression(cond, BOOL)?;
                }

                if let Some(update) = update {
                    self.check_statement(update)?;
                }
            },

            ForKind::Iterate {
                element,
                index,
                target,
            } => {
                let iterable = self.infer(target, None)?;
                let unwrapped = self.unwrap(iterable);

                let element_kind = match self.kinds.get(unwrapped) {
                    Kind::Array { element, .. } => *element,
                    Kind::String => CHAR,
                    Kind::Any => ANY,

                    _ => {
                        return Err(self.error(
                            ErrorKind::KindMismatch,
                            target.span,
                            format!("cannot iterate over `{}`", self.kinds.describe(iterable)),
                        ))
                    },
                };

                self.bind_variable(element, element_kind, false)?;

                if let Some(index) = index {
                    self.bind_variable(index, NUMBER, false)?;
                }
            },
        }

        self.check_block(body)
    }

    /// Works out the kind of a declared variable and checks its
    /// initializer. `declared` is the kind pass 1 already resolved.
    pub(super) fn variable_kind(
        &mut self,
        variable: &VariableDecl,
        declared: Option<KindRef>,
    ) -> Result<KindRef, CompileError> {
        match (&variable.kind, &variable.init) {
            (
                Some(KindExpr {
                    kind: KindExprKind::Array(element, ArrayLength::Inferred),
                    ..
                }),
                Some(init),
            ) => {
                let element = self.resolve_kind_expr(element)?;
                let received = self.infer(init, None)?;

                let length = match self.kinds.get(self.unwrap(received)) {
                    Kind::Array {
                        length: Length::Fixed(n),
                        ..
                    } => *n,

                    _ => {
                        return Err(self.error(
                            ErrorKind::KindMismatch,
                            init.span,
                            format!(
                                "the length of `{}` can't be taken from a value of type `{}`",
                                variable.name,
                                self.kinds.describe(received)
                            ),
                        ))
                    },
                };

                let kind = self.kinds.add(Kind::Array {
                    element,
                    length: Length::Fixed(length),
                });

                if !self.matches(kind, received, false) {
                    return Err(self.mismatch(kind, received, init.span));
                }

                Ok(kind)
            },

            (Some(kind), init) => {
                let kind = match declared {
                    Some(res) => res,
                    None => self.resolve_kind_expr(kind)?,
                };

                if let Some(init) = init {
                    self.check_expression(init, kind)?;
                }

                Ok(kind)
            },

            (None, Some(init)) => {
                let kind = self.infer(init, None)?;

                if kind == NULL || kind == VOID {
                    let found = if kind == NULL { "`null`" } else { "an expression without a value" };

                    let source = self.source_of(self.current);

                    return Err(DiagnosticsContext::new(&source)
                        .build_error_span(
                            ErrorKind::KindMismatch,
                            init.span,
                            format!("cannot infer the type of `{}` from {}", variable.name, found),
                        )
                        .help(format!("give `{}` a type annotation", variable.name))
                        .build());
                }

                Ok(kind)
            },

            (None, None) => Err(self.error(
                ErrorKind::Internal,
                variable.name.span,
                format!("variable `{}` has neither a type nor a value", variable.name),
            )),
        }
    }
}
