use super::{ast::*, expected::Expected, Parser, CLOSE_BRACE, COMMA, OPEN_BRACE};
use crate::{
    errors::{CompileError, ErrorKind},
    lexer::{
        keyword::{Constant, Keyword},
        token::{DelimKind, Symbol, TokenKind},
    },
};

impl<'src> Parser<'src> {
    /// Parses type syntax.
    pub(super) fn parse_kind_expr(&mut self) -> Result<KindExpr, CompileError> {
        self.parse_kind_expr_with(false)
    }

    /// Like [`parse_kind_expr`](Parser::parse_kind_expr), but lets the
    /// outermost kind be an array of inferred length (`[]T`).
    pub(super) fn parse_kind_expr_with(&mut self, allow_inferred_len: bool) -> Result<KindExpr, CompileError> {
        let token = self.peek().clone();
        let start = token.span;

        match token.kind {
            TokenKind::Ident(name) => {
                self.bump();

                if let Some(primitive) = PrimitiveKind::from_str(&name) {
                    return Ok(KindExpr::new(KindExprKind::Primitive(primitive), start));
                }

                if !self.next_is_symbol(0, Symbol::Dot) {
                    return Ok(KindExpr::new(KindExprKind::Identifier(name), start));
                }

                let mut path = vec![Ident::new(name, start)];

                while self.eat(Expected::Symbol(Symbol::Dot)) {
                    path.push(self.expect_ident("type name")?);
                }

                Ok(KindExpr::new(KindExprKind::Member(path), start.to(self.prev_span)))
            },

            TokenKind::Const(Constant::SelfValue) => {
                self.bump();
                Ok(KindExpr::new(KindExprKind::SelfKind, start))
            },

            TokenKind::OpenDelim(DelimKind::Bracket) => {
                self.bump();
                let close = Expected::CloseDelim(DelimKind::Bracket);

                let length = if self.eat(close) {
                    if !allow_inferred_len {
                        return Err(self
                            .error_ctx
                            .build_error_span(
                                ErrorKind::Parse,
                                start.to(self.prev_span),
                                "arrays of inferred length are only allowed in variable declarations",
                            )
                            .help("give the length explicitly, ex. `[3]number`, or use a vector `[..]number`")
                            .build());
                    }

                    ArrayLength::Inferred
                } else if self.eat(Expected::Symbol(Symbol::DotDot)) {
                    self.expect_item(close)?;
                    ArrayLength::Vector
                } else {
                    let length = self.parse_array_length()?;
                    self.expect_item(close)?;
                    ArrayLength::Fixed(length)
                };

                let element = self.parse_kind_expr()?;
                let span = start.to(element.span);

                Ok(KindExpr::new(KindExprKind::Array(Box::new(element), length), span))
            },

            TokenKind::Keyword(Keyword::Fn) => {
                self.bump();
                let signature = self.parse_signature(false)?;
                let span = start.to(signature.span);

                Ok(KindExpr::new(KindExprKind::Function(signature), span))
            },

            TokenKind::Keyword(Keyword::Struct) => {
                self.bump();
                let mut extends = Vec::new();

                // `struct<-A, B { ... }`
                if self.eat(Expected::Symbol(Symbol::Less)) {
                    self.expect_item(Expected::Symbol(Symbol::Minus))?;

                    loop {
                        extends.push(self.parse_kind_expr()?);

                        if !self.eat(COMMA) {
                            break;
                        }
                    }
                }

                self.expect_item(OPEN_BRACE)?;
                let props = self.parse_props(false)?;
                let end = self.expect_item(CLOSE_BRACE)?.span;

                Ok(KindExpr::new(KindExprKind::Struct { extends, props }, start.to(end)))
            },

            _ => {
                self.expected_items.insert(Expected::Kind);
                Err(self.unexpected())
            },
        }
    }

    /// The `N` of `[N]T`, which must be a non-negative integer.
    fn parse_array_length(&mut self) -> Result<usize, CompileError> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::Number(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => {
                self.bump();
                Ok(n as usize)
            },

            TokenKind::Number(n) => Err(self
                .error_ctx
                .build_error_span(ErrorKind::Parse, token.span, format!("invalid array length `{}`", n))
                .note("array lengths must be non-negative integers")
                .build()),

            _ => {
                self.expected_items.insert(Expected::Number);
                self.expected_items.insert(Expected::Symbol(Symbol::DotDot));
                Err(self.unexpected())
            },
        }
    }
}
