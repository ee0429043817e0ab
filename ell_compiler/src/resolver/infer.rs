//! Inferring the kinds of expressions.

use super::{
    kinds::{Kind, KindRef, Length, ANY, BOOL, CHAR, NULL, NUMBER, SELF, STRING, UNRESOLVED},
    values::{Value, ValueRef},
    Resolver,
};
use crate::{
    errors::{CompileError, DiagnosticsContext, ErrorKind, Span},
    parser::ast::{BinaryOperator, Expression, ExpressionKind, FieldInit, Ident, Member, UnaryOperator},
};

/// What a named member expression refers to.
enum Accessed {
    /// A value exported by an imported module.
    ModuleValue(ValueRef),
    Choice,
    Property,
    Method,
    /// Anything goes on `any`.
    Unknown,
}

impl<'p> Resolver<'p> {
    /// Infers the kind of `expr` and checks it against `expected`.
    pub(super) fn check_expression(&mut self, expr: &Expression, expected: KindRef) -> Result<KindRef, CompileError> {
        let received = self.infer(expr, Some(expected))?;

        // Struct literals may leave properties out
        let loose = matches!(expr.kind, ExpressionKind::Struct(..));

        if self.matches(expected, received, loose) {
            Ok(received)
        } else {
            Err(self.mismatch(expected, received, expr.span))
        }
    }

    /// Infers the kind of `expr`. `expected` only guides literals, it
    /// isn't checked.
    pub(super) fn infer(&mut self, expr: &Expression, expected: Option<KindRef>) -> Result<KindRef, CompileError> {
        match &expr.kind {
            ExpressionKind::Number(_) => Ok(NUMBER),
            ExpressionKind::Bool(_) => Ok(BOOL),
            ExpressionKind::String { .. } => Ok(STRING),
            ExpressionKind::Char(_) => Ok(CHAR),
            ExpressionKind::Null => Ok(NULL),

            ExpressionKind::Identifier(name) => self.infer_identifier(name, expr.span),

            ExpressionKind::SelfValue => match self.find_value("self").map(|value| self.values.get(value)) {
                Some(Value::SelfValue { kind }) => Ok(*kind),
                _ => Err(self.error(
                    ErrorKind::UnknownName,
                    expr.span,
                    "`self` is only available inside methods",
                )),
            },

            ExpressionKind::Member(object, Member::Named(name)) => self.infer_member(object, name).map(|(kind, _)| kind),

            ExpressionKind::Member(object, Member::Computed(index)) => {
                let indexed = self.infer(object, None)?;
                self.check_expression(index, NUMBER)?;

                match self.kinds.get(self.unwrap(indexed)) {
                    Kind::Array { element, .. } => Ok(*element),
                    Kind::String => Ok(CHAR),
                    Kind::Any => Ok(ANY),

                    _ => Err(self.error(
                        ErrorKind::KindMismatch,
                        object.span,
                        format!("cannot index into a value of type `{}`", self.kinds.describe(indexed)),
                    )),
                }
            },

            ExpressionKind::Call(callee, args) => self.infer_call(callee, args, expr.span),

            ExpressionKind::Binary(lhs, op, rhs) => self.infer_binary(lhs, *op, rhs),

            ExpressionKind::Unary(op, operand) => match op {
                UnaryOperator::Not => self.check_expression(operand, BOOL).map(|_| BOOL),

                UnaryOperator::BitNot | UnaryOperator::Negative | UnaryOperator::Positive => {
                    self.check_expression(operand, NUMBER).map(|_| NUMBER)
                },

                UnaryOperator::PreIncrement
                | UnaryOperator::PreDecrement
                | UnaryOperator::PostIncrement
                | UnaryOperator::PostDecrement => {
                    let kind = self.check_place(operand)?;

                    if self.matches(NUMBER, kind, false) {
                        Ok(NUMBER)
                    } else {
                        Err(self.mismatch(NUMBER, kind, operand.span))
                    }
                },

                // There are no pointer kinds
                UnaryOperator::AddressOf | UnaryOperator::Deref => self.infer(operand, expected),
            },

            ExpressionKind::Assign(lhs, rhs) => {
                let kind = self.check_place(lhs)?;
                self.check_expression(rhs, kind)?;
                Ok(kind)
            },

            ExpressionKind::Function(signature, body) => {
                let kind = self.resolve_signature(signature)?;
                let self_kind = self.self_kind();
                self.check_function_body(kind, self_kind, signature, body)?;
                Ok(kind)
            },

            ExpressionKind::Struct(name, fields) => self.infer_struct(name.as_ref(), fields, expected),

            ExpressionKind::Array(elements) => self.infer_array(elements, expected),
        }
    }

    fn infer_identifier(&mut self, name: &str, span: Span) -> Result<KindRef, CompileError> {
        let value = match self.find_value(name) {
            Some(res) => res,

            None => {
                let message = if self.find_kind(name).is_some() {
                    format!("expected a value, found type `{}`", name)
                } else {
                    format!("cannot find `{}` in this scope", name)
                };

                return Err(self.error(ErrorKind::UnknownName, span, message));
            },
        };

        self.value_kind(value, name, span)
    }

    /// The kind of a value used in an expression.
    fn value_kind(&self, value: ValueRef, name: &str, span: Span) -> Result<KindRef, CompileError> {
        match self.values.get(value).kind() {
            Some(UNRESOLVED) => {
                let source = self.source_of(self.current);

                Err(DiagnosticsContext::new(&source)
                    .build_error_span(
                        ErrorKind::UnknownName,
                        span,
                        format!("`{}` is used before its type is known", name),
                    )
                    .help(format!("move the declaration of `{}` before this point", name))
                    .build())
            },

            Some(kind) => Ok(kind),

            None => Err(self.error(
                ErrorKind::UnknownName,
                span,
                format!("expected a value, found module `{}`", name),
            )),
        }
    }

    /// The kind named by `expr` when it's a type path rather than a value,
    /// as in `Color.Red` or `module.Color.Red`.
    fn kind_path(&self, expr: &Expression) -> Result<Option<KindRef>, CompileError> {
        match &expr.kind {
            ExpressionKind::Identifier(name) if self.find_value(name).is_none() => Ok(self.find_kind(name)),

            ExpressionKind::Member(object, Member::Named(name)) => match &object.kind {
                ExpressionKind::Identifier(alias) => match self.find_module(alias) {
                    Some(module) if self.modules.get(module).public.value(&name.name).is_none() => {
                        self.module_kind(module, name).map(Some)
                    },

                    _ => Ok(None),
                },

                _ => Ok(None),
            },

            _ => Ok(None),
        }
    }

    fn infer_member(&mut self, object: &Expression, name: &Ident) -> Result<(KindRef, Accessed), CompileError> {
        // Values of imported modules
        if let ExpressionKind::Identifier(alias) = &object.kind {
            if let Some(module) = self.find_module(alias) {
                if self.modules.get(module).public.kind(&name.name).is_none() {
                    let value = self.module_value(module, alias, name)?;
                    let kind = self.value_kind(value, &name.name, name.span)?;
                    return Ok((kind, Accessed::ModuleValue(value)));
                }
            }
        }

        // Enum choices
        if let Some(kind) = self.kind_path(object)? {
            return match self.kinds.get(self.kinds.unwrap_alias(kind)) {
                Kind::Enum { choices, .. } if choices.contains(&name.name) => Ok((kind, Accessed::Choice)),

                Kind::Enum { .. } => Err(self.error(
                    ErrorKind::UnknownName,
                    name.span,
                    format!("enum `{}` has no choice `{}`", self.kinds.describe(kind), name),
                )),

                _ => Err(self.error(
                    ErrorKind::UnknownName,
                    object.span,
                    format!("expected a value, found type `{}`", self.kinds.describe(kind)),
                )),
            };
        }

        let receiver = self.infer(object, None)?;
        let receiver = match (receiver, self.self_kind()) {
            (SELF, Some(target)) => target,
            _ => receiver,
        };
        let unwrapped = self.kinds.unwrap_alias(receiver);

        if unwrapped == ANY {
            return Ok((ANY, Accessed::Unknown));
        }

        if let Some((_, kind)) = self
            .kinds
            .effective_props(unwrapped, self.current)
            .into_iter()
            .find(|(prop, _)| *prop == name.name)
        {
            return Ok((kind, Accessed::Property));
        }

        if let Some(method) = self.kinds.lookup_method(receiver, &name.name).cloned() {
            if name.is_private() && method.module != self.current {
                return Err(self.error(
                    ErrorKind::PrivateAccess,
                    name.span,
                    format!("method `{}` is private to the module that defines it", name),
                ));
            }

            let kind = match self.values.get(method.value).kind() {
                Some(res) => res,
                None => return Err(self.error(ErrorKind::Internal, name.span, "method without a kind")),
            };

            return Ok((self.kinds.substitute_self(kind, receiver), Accessed::Method));
        }

        if let Kind::Struct { module, .. } = self.kinds.get(unwrapped) {
            let owner = *module;

            if name.is_private()
                && owner != self.current
                && self
                    .kinds
                    .effective_props(unwrapped, owner)
                    .iter()
                    .any(|(prop, _)| *prop == name.name)
            {
                return Err(self.error(
                    ErrorKind::PrivateAccess,
                    name.span,
                    format!("property `{}` of `{}` is private", name, self.kinds.describe(receiver)),
                ));
            }
        }

        Err(self.error(
            ErrorKind::UnknownName,
            name.span,
            format!(
                "no property or method `{}` on type `{}`",
                name,
                self.kinds.describe(receiver)
            ),
        ))
    }

    fn infer_call(&mut self, callee: &Expression, args: &[Expression], span: Span) -> Result<KindRef, CompileError> {
        let callee_kind = self.infer(callee, None)?;

        let (params, ret, rest) = match self.kinds.get(self.unwrap(callee_kind)).clone() {
            Kind::Function { params, ret, rest } => (params, ret, rest),

            Kind::Any => {
                for arg in args {
                    self.infer(arg, None)?;
                }

                return Ok(ANY);
            },

            _ => {
                return Err(self.error(
                    ErrorKind::KindMismatch,
                    callee.span,
                    format!("`{}` is not a function", self.kinds.describe(callee_kind)),
                ))
            },
        };

        let fixed = if rest { params.len() - 1 } else { params.len() };

        if args.len() < fixed || (!rest && args.len() > fixed) {
            let expected = if rest {
                format!("at least {}", fixed)
            } else {
                fixed.to_string()
            };

            return Err(self.error(
                ErrorKind::WrongArity,
                span,
                format!(
                    "expected {} argument{}, found {}",
                    expected,
                    if fixed == 1 { "" } else { "s" },
                    args.len()
                ),
            ));
        }

        for (arg, param) in args.iter().zip(&params[..fixed]) {
            self.check_expression(arg, *param)?;
        }

        if rest {
            let vector = self.unwrap(params[fixed]);

            let element = match self.kinds.get(vector) {
                Kind::Array { element, .. } => *element,
                _ => ANY,
            };

            for arg in &args[fixed..] {
                self.check_expression(arg, element)?;
            }
        }

        Ok(ret)
    }

    fn infer_binary(&mut self, lhs: &Expression, op: BinaryOperator, rhs: &Expression) -> Result<KindRef, CompileError> {
        match op {
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Modulo
            | BinaryOperator::BitAnd
            | BinaryOperator::BitXor
            | BinaryOperator::BitOr => {
                self.check_expression(lhs, NUMBER)?;
                self.check_expression(rhs, NUMBER)?;
                Ok(NUMBER)
            },

            BinaryOperator::BoolAnd | BinaryOperator::BoolOr => {
                self.check_expression(lhs, BOOL)?;
                self.check_expression(rhs, BOOL)?;
                Ok(BOOL)
            },

            BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual
            | BinaryOperator::Equal
            | BinaryOperator::NotEqual => {
                let kind = self.infer(lhs, None)?;
                self.check_expression(rhs, kind)?;
                Ok(BOOL)
            },
        }
    }

    /// Checks that `expr` can be assigned to and returns its kind.
    fn check_place(&mut self, expr: &Expression) -> Result<KindRef, CompileError> {
        match &expr.kind {
            ExpressionKind::Identifier(name) => {
                let kind = self.infer_identifier(name, expr.span)?;

                match self.find_value(name).map(|value| self.values.get(value)) {
                    Some(value) if value.is_assignable() => Ok(kind),

                    Some(Value::Variable { .. }) => Err(self.error(
                        ErrorKind::NotAssignable,
                        expr.span,
                        format!("cannot assign twice to constant `{}`", name),
                    )),

                    _ => Err(self.error(
                        ErrorKind::NotAssignable,
                        expr.span,
                        format!("cannot assign to `{}`", name),
                    )),
                }
            },

            ExpressionKind::Member(object, Member::Named(name)) => {
                let (kind, accessed) = self.infer_member(object, name)?;

                match accessed {
                    Accessed::Property | Accessed::Unknown => Ok(kind),
                    Accessed::ModuleValue(value) if self.values.get(value).is_assignable() => Ok(kind),

                    Accessed::Method => Err(self.error(
                        ErrorKind::NotAssignable,
                        expr.span,
                        format!("cannot assign to method `{}`", name),
                    )),

                    _ => Err(self.error(
                        ErrorKind::NotAssignable,
                        expr.span,
                        format!("cannot assign to `{}`", expr),
                    )),
                }
            },

            ExpressionKind::Member(_, Member::Computed(_)) => self.infer(expr, None),
            ExpressionKind::Unary(UnaryOperator::Deref, _) => self.infer(expr, None),

            _ => Err(self.error(
                ErrorKind::NotAssignable,
                expr.span,
                "invalid left-hand side of assignment",
            )),
        }
    }

    fn infer_struct(
        &mut self,
        name: Option<&Ident>,
        fields: &[FieldInit],
        expected: Option<KindRef>,
    ) -> Result<KindRef, CompileError> {
        let kind = match name {
            Some(name) => {
                let kind = self.find_kind(&name.name).ok_or_else(|| {
                    self.error(
                        ErrorKind::UnknownName,
                        name.span,
                        format!("cannot find type `{}` in this scope", name),
                    )
                })?;

                if !matches!(self.kinds.get(self.unwrap(kind)), Kind::Struct { .. }) {
                    return Err(self.error(
                        ErrorKind::KindMismatch,
                        name.span,
                        format!("`{}` is not a struct", name),
                    ));
                }

                Some(kind)
            },

            None => expected.filter(|kind| matches!(self.kinds.get(self.unwrap(*kind)), Kind::Struct { .. })),
        };

        for (idx, field) in fields.iter().enumerate() {
            if fields[..idx].iter().any(|other| other.name.name == field.name.name) {
                return Err(self.error(
                    ErrorKind::DuplicateName,
                    field.name.span,
                    format!("property `{}` is initialized more than once", field.name),
                ));
            }
        }

        match kind {
            Some(kind) => {
                let props = self.kinds.effective_props(self.unwrap(kind), self.current);

                for field in fields {
                    let prop = match props.iter().find(|(prop, _)| *prop == field.name.name) {
                        Some((_, res)) => *res,

                        None => {
                            return Err(self.error(
                                ErrorKind::UnknownName,
                                field.name.span,
                                format!(
                                    "struct `{}` has no property `{}`",
                                    self.kinds.describe(kind),
                                    field.name
                                ),
                            ))
                        },
                    };

                    self.check_expression(&field.value, prop)?;
                }

                Ok(kind)
            },

            None => {
                let mut props = Vec::with_capacity(fields.len());

                for field in fields {
                    props.push((field.name.name.clone(), self.infer(&field.value, None)?));
                }

                Ok(self.kinds.add(Kind::Struct {
                    name: None,
                    extends: Vec::new(),
                    props,
                    implements: None,
                    module: self.current,
                }))
            },
        }
    }

    fn infer_array(&mut self, elements: &[Expression], expected: Option<KindRef>) -> Result<KindRef, CompileError> {
        if let Some(expected) = expected.map(|kind| self.unwrap(kind)) {
            if let Kind::Array { element, length } = self.kinds.get(expected).clone() {
                for item in elements {
                    self.check_expression(item, element)?;
                }

                // Vectors take any number of elements
                return Ok(match length {
                    Length::Vector => expected,
                    Length::Fixed(_) => self.kinds.add(Kind::Array {
                        element,
                        length: Length::Fixed(elements.len()),
                    }),
                });
            }
        }

        let element = match elements.split_first() {
            Some((first, rest)) => {
                let kind = self.infer(first, None)?;

                for item in rest {
                    self.check_expression(item, kind)?;
                }

                kind
            },

            None => ANY,
        };

        Ok(self.kinds.add(Kind::Array {
            element,
            length: Length::Fixed(elements.len()),
        }))
    }
}
