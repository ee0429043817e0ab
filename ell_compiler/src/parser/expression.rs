use super::{ast::*, expected::Expected, Parser, COLON, COMMA};
use crate::{
    errors::{CompileError, ErrorKind},
    lexer::{
        keyword::{Constant, Keyword},
        token::{DelimKind, Symbol, TokenKind},
    },
};

/// Binding power of `.`, `(...)`, `[...]` and postfix `++`/`--`.
const POSTFIX_BIND_POWER: u8 = 36;
/// Right binding power of prefix operators.
const PREFIX_BIND_POWER: u8 = 34;
/// `=` binds weakest and associates to the right.
const ASSIGN_BIND_POWER: (u8, u8) = (4, 4);

fn token_as_binary_op(token_kind: &TokenKind) -> Option<BinaryOperator> {
    let symbol = match token_kind {
        TokenKind::Symbol(res) => res,
        _ => return None,
    };

    match symbol {
        Symbol::PipePipe => Some(BinaryOperator::BoolOr),
        Symbol::AndAnd => Some(BinaryOperator::BoolAnd),
        Symbol::DoubleEquals => Some(BinaryOperator::Equal),
        Symbol::ExclEqual => Some(BinaryOperator::NotEqual),
        Symbol::Greater => Some(BinaryOperator::Greater),
        Symbol::Less => Some(BinaryOperator::Less),
        Symbol::GreaterEqual => Some(BinaryOperator::GreaterEqual),
        Symbol::LessEqual => Some(BinaryOperator::LessEqual),
        Symbol::Pipe => Some(BinaryOperator::BitOr),
        Symbol::Caret => Some(BinaryOperator::BitXor),
        Symbol::And => Some(BinaryOperator::BitAnd),
        Symbol::Plus => Some(BinaryOperator::Add),
        Symbol::Minus => Some(BinaryOperator::Subtract),
        Symbol::Star => Some(BinaryOperator::Multiply),
        Symbol::Slash => Some(BinaryOperator::Divide),
        Symbol::Percent => Some(BinaryOperator::Modulo),
        _ => None,
    }
}

fn token_as_prefix_op(token_kind: &TokenKind) -> Option<UnaryOperator> {
    match token_kind {
        TokenKind::Symbol(Symbol::Exclamation) => Some(UnaryOperator::Not),
        TokenKind::Symbol(Symbol::Tilde) => Some(UnaryOperator::BitNot),
        TokenKind::Symbol(Symbol::Minus) => Some(UnaryOperator::Negative),
        TokenKind::Symbol(Symbol::Plus) => Some(UnaryOperator::Positive),
        // The lexer only knows it's a prefix operator when the previous token
        // says so, but at the start of an operand it can only be one
        TokenKind::Symbol(Symbol::AddressOf | Symbol::And) => Some(UnaryOperator::AddressOf),
        TokenKind::Symbol(Symbol::Deref | Symbol::Star) => Some(UnaryOperator::Deref),
        TokenKind::Symbol(Symbol::PlusPlus) => Some(UnaryOperator::PreIncrement),
        TokenKind::Symbol(Symbol::MinusMinus) => Some(UnaryOperator::PreDecrement),
        _ => None,
    }
}

/// Returns `(left_power, right_power)` for a given binary operator token.
/// Higher powers bind tighter; every binary operator is left associative,
/// so the right power is one above the left one.
///
/// For more information, see [this article] about Pratt parsing.
///
/// [this article]: https://matklad.github.io/2020/04/13/simple-but-powerful-pratt-parsing.html
fn bind_power_for_binop(token_kind: &TokenKind) -> (u8, u8) {
    let precedence = token_kind.meta().precedence;
    (precedence * 2, precedence * 2 + 1)
}

impl<'src> Parser<'src> {
    pub(super) fn parse_expression(&mut self) -> Result<Expression, CompileError> {
        self.parse_expression_bp(0)
    }

    /// Parses an expression whose operators bind at least as tightly as
    /// `min_bind_power`.
    fn parse_expression_bp(&mut self, min_bind_power: u8) -> Result<Expression, CompileError> {
        let mut res = self.parse_prefix()?;

        loop {
            let next = self.peek().clone();
            let span = res.span;

            let postfix_allowed = POSTFIX_BIND_POWER >= min_bind_power;

            match &next.kind {
                // `(`, `[`, `++` and `--` never continue an expression on the next line
                TokenKind::OpenDelim(DelimKind::Paren) if postfix_allowed && !next.seen_newline => {
                    self.bump();
                    let args = self.parse_expr_list(DelimKind::Paren)?;
                    let end = self.expect_item(Expected::CloseDelim(DelimKind::Paren))?.span;

                    res = Expression::new(ExpressionKind::Call(Box::new(res), args), span.to(end));
                    continue;
                },

                TokenKind::OpenDelim(DelimKind::Bracket) if postfix_allowed && !next.seen_newline => {
                    self.bump();
                    let index = self.with_struct_literals(true, |this| this.parse_expression())?;
                    let end = self.expect_item(Expected::CloseDelim(DelimKind::Bracket))?.span;

                    res = Expression::new(
                        ExpressionKind::Member(Box::new(res), Member::Computed(Box::new(index))),
                        span.to(end),
                    );
                    continue;
                },

                TokenKind::Symbol(Symbol::Dot) if postfix_allowed => {
                    self.bump();
                    let name = self.expect_ident("member name")?;
                    let end = name.span;

                    res = Expression::new(
                        ExpressionKind::Member(Box::new(res), Member::Named(name)),
                        span.to(end),
                    );
                    continue;
                },

                TokenKind::Symbol(symbol @ (Symbol::PlusPlus | Symbol::MinusMinus))
                    if postfix_allowed && !next.seen_newline =>
                {
                    let op = if *symbol == Symbol::PlusPlus {
                        UnaryOperator::PostIncrement
                    } else {
                        UnaryOperator::PostDecrement
                    };

                    self.bump();
                    res = Expression::new(ExpressionKind::Unary(op, Box::new(res)), span.to(next.span));
                    continue;
                },

                TokenKind::Symbol(Symbol::Equals) => {
                    let (left_bind_power, right_bind_power) = ASSIGN_BIND_POWER;

                    if left_bind_power < min_bind_power {
                        break;
                    }

                    self.bump();
                    let rhs = self.parse_expression_bp(right_bind_power)?;
                    let span = span.to(rhs.span);

                    res = Expression::new(ExpressionKind::Assign(Box::new(res), Box::new(rhs)), span);
                    continue;
                },

                _ => {},
            }

            let operator = match token_as_binary_op(&next.kind) {
                Some(res) => res,
                None => break,
            };

            let (left_bind_power, right_bind_power) = bind_power_for_binop(&next.kind);

            if left_bind_power < min_bind_power {
                break;
            }

            self.bump();
            let rhs = self.parse_expression_bp(right_bind_power)?;
            let span = span.to(rhs.span);

            res = Expression::new(ExpressionKind::Binary(Box::new(res), operator, Box::new(rhs)), span);
        }

        Ok(res)
    }

    fn parse_prefix(&mut self) -> Result<Expression, CompileError> {
        let next = self.peek().clone();

        match token_as_prefix_op(&next.kind) {
            Some(op) => {
                self.bump();
                let operand = self.parse_expression_bp(PREFIX_BIND_POWER)?;
                let span = next.span.to(operand.span);

                Ok(Expression::new(ExpressionKind::Unary(op, Box::new(operand)), span))
            },

            None => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, CompileError> {
        let token = self.peek().clone();
        let span = token.span;

        let kind = match token.kind {
            TokenKind::Number(n) => {
                self.bump();
                ExpressionKind::Number(n)
            },

            TokenKind::String { value, raw } => {
                self.bump();
                ExpressionKind::String { value, raw }
            },

            TokenKind::Char(c) => {
                self.bump();
                ExpressionKind::Char(c)
            },

            TokenKind::Const(constant) => {
                self.bump();

                match constant {
                    Constant::True => ExpressionKind::Bool(true),
                    Constant::False => ExpressionKind::Bool(false),
                    Constant::Null => ExpressionKind::Null,
                    Constant::SelfValue => ExpressionKind::SelfValue,
                }
            },

            TokenKind::Ident(name) => {
                self.bump();

                let struct_literal = !self.no_struct_literal
                    && !self.newline_before_next()
                    && self.peek().kind == TokenKind::OpenDelim(DelimKind::Brace);

                if struct_literal {
                    let name = Ident::new(name, span);
                    return self.parse_struct_literal(Some(name));
                }

                ExpressionKind::Identifier(name)
            },

            TokenKind::OpenDelim(DelimKind::Paren) => {
                self.bump();
                let mut expr = self.with_struct_literals(true, |this| this.parse_expression())?;
                let end = self.expect_item(Expected::CloseDelim(DelimKind::Paren))?.span;
                expr.span = span.to(end);

                return Ok(expr);
            },

            TokenKind::OpenDelim(DelimKind::Bracket) => {
                self.bump();
                let elements = self.parse_expr_list(DelimKind::Bracket)?;
                let end = self.expect_item(Expected::CloseDelim(DelimKind::Bracket))?.span;

                return Ok(Expression::new(ExpressionKind::Array(elements), span.to(end)));
            },

            TokenKind::OpenDelim(DelimKind::Brace) if !self.no_struct_literal => {
                return self.parse_struct_literal(None);
            },

            TokenKind::Keyword(Keyword::Fn) => {
                self.bump();
                let signature = self.parse_signature(true)?;
                let body = self.parse_function_body()?;
                let span = span.to(body.span);

                return Ok(Expression::new(ExpressionKind::Function(signature, body), span));
            },

            _ => {
                self.expected_items.insert(Expected::Expression);
                return Err(self.unexpected());
            },
        };

        Ok(Expression::new(kind, span))
    }

    /// Parses a comma separated list of expressions up to the closing
    /// `delim`, which is not consumed. A trailing comma is allowed.
    fn parse_expr_list(&mut self, delim: DelimKind) -> Result<Vec<Expression>, CompileError> {
        let close = Expected::CloseDelim(delim);

        self.with_struct_literals(true, |this| {
            let mut res = Vec::new();

            while !this.check_next(close) {
                if this.check_next(COMMA) {
                    let span = this.peek().span;

                    return Err(this
                        .error_ctx
                        .build_error_span(ErrorKind::Parse, span, "expected expression, found `,`")
                        .help("try removing this separator")
                        .build());
                }

                res.push(this.parse_expression()?);

                if !this.eat(COMMA) && !this.check_next(close) {
                    return Err(this.unexpected());
                }
            }

            Ok(res)
        })
    }

    /// `Name{ a: 1, b: 2 }` or `{ a: 1 }`. The name, if any, has already
    /// been consumed.
    fn parse_struct_literal(&mut self, name: Option<Ident>) -> Result<Expression, CompileError> {
        let open = self.expect_item(Expected::OpenDelim(DelimKind::Brace))?.span;
        let start = name.as_ref().map_or(open, |name| name.span);

        let fields = self.with_struct_literals(true, |this| {
            let mut fields = Vec::new();

            while !this.check_next(Expected::CloseDelim(DelimKind::Brace)) {
                let name = this.expect_ident("field name")?;
                this.expect_item(COLON)?;
                let value = this.parse_expression()?;
                fields.push(FieldInit { name, value });
                this.end_list_item()?;
            }

            Ok(fields)
        })?;

        let end = self.expect_item(Expected::CloseDelim(DelimKind::Brace))?.span;

        Ok(Expression::new(ExpressionKind::Struct(name, fields), start.to(end)))
    }
}
