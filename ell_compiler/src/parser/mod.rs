pub mod ast;
mod expected;
mod expression;
mod kind_expr;

#[cfg(test)]
mod tests;

use std::{
    collections::{HashSet, VecDeque},
    mem,
};

use self::{ast::*, expected::Expected};
use crate::{
    errors::{CompileError, DiagnosticsContext, ErrorKind, SourceBuffer, Span},
    lexer::{
        keyword::Keyword,
        token::{DelimKind, Symbol, Token, TokenKind},
        Lexer,
    },
};

const OPEN_BRACE: Expected = Expected::OpenDelim(DelimKind::Brace);
const CLOSE_BRACE: Expected = Expected::CloseDelim(DelimKind::Brace);
const SEMICOLON: Expected = Expected::Symbol(Symbol::Semicolon);
const COLON: Expected = Expected::Symbol(Symbol::Colon);
const COMMA: Expected = Expected::Symbol(Symbol::Comma);

/// How many tokens the parser can see ahead of the current one, plus one.
const LOOKAHEAD: usize = 4;

/// Holds the parser's state.
struct Parser<'src> {
    lexer: Lexer<'src>,
    /// The next tokens, pulled from `lexer` as the parser moves on.
    /// Holds `LOOKAHEAD` tokens unless it ends with the EOF token.
    lookahead: VecDeque<Token>,
    /// The lexer's error, if it ran into one. The token stream ends
    /// there.
    lex_error: Option<CompileError>,
    eof: Span,
    /// Number of tokens consumed so far.
    pos: usize,
    /// Kind of the last consumed token, used for the statement boundary
    /// rule.
    prev_kind: TokenKind,
    prev_span: Span,
    /// A set of expected tokens for diagnostic purposes.
    /// This is to allow for diagnostics such as
    /// `unexpected token 'rickrolled'` with `note: expected identifier`.
    expected_items: HashSet<Expected>,
    block_level: usize,
    fn_level: usize,
    loop_level: usize,
    /// Labels of the loops we are currently in, innermost last.
    labels: Vec<String>,
    /// Set while parsing `if`/`for` headers, where `{` opens the body.
    no_struct_literal: bool,
    error_ctx: DiagnosticsContext<'src>,
}

impl<'src> Parser<'src> {
    fn new(source: &'src SourceBuffer) -> Self {
        let mut res = Self {
            lexer: Lexer::new(source),
            lookahead: VecDeque::with_capacity(LOOKAHEAD),
            lex_error: None,
            eof: Span::point(source.len()),
            pos: 0,
            prev_kind: TokenKind::Eof,
            prev_span: Span::empty(),
            expected_items: HashSet::new(),
            block_level: 0,
            fn_level: 0,
            loop_level: 0,
            labels: Vec::new(),
            no_struct_literal: false,
            error_ctx: DiagnosticsContext::new(source),
        };

        res.fill();
        res
    }

    /// Pulls tokens from the lexer until `LOOKAHEAD` are buffered or the
    /// stream has ended. A lex error ends the stream early.
    fn fill(&mut self) {
        while self.lookahead.len() < LOOKAHEAD && !self.lookahead.back().map_or(false, |token| token.kind.is_eof()) {
            match self.lexer.next() {
                Ok(token) => self.lookahead.push_back(token),

                Err(err) => {
                    self.lex_error = Some(err);
                    self.lookahead.push_back(Token::new(TokenKind::Eof, self.eof, false));
                },
            }
        }
    }

    /// The `n`-th token ahead, for `n` below `LOOKAHEAD`. Past the end
    /// this is the EOF token.
    fn look(&self, n: usize) -> &Token {
        debug_assert!(n < LOOKAHEAD);
        let idx = n.min(self.lookahead.len() - 1);
        &self.lookahead[idx]
    }

    fn peek(&self) -> &Token {
        self.look(0)
    }

    /// Get the next token.
    /// This exists because it has some other responsibilities,
    /// like clearing `expected_items`.
    fn bump(&mut self) -> Token {
        self.expected_items.clear();
        let token = self.peek().clone();

        if !token.kind.is_eof() {
            self.lookahead.pop_front();
            self.fill();
            self.pos += 1;
        }

        self.prev_kind = token.kind.clone();
        self.prev_span = token.span;
        token
    }

    /// Builds a diagnostic of the form `unexpected token {token.kind}`
    /// or `unexpected end of file`.
    /// This architecture is ~~borrowed until death from~~ inspired by rustc.
    fn unexpected(&mut self) -> CompileError {
        let token = self.peek().clone();

        let mut error = if token.kind.is_eof() {
            self.error_ctx
                .build_error(ErrorKind::Parse, "unexpected end of file")
                .with_eof_span()
        } else {
            self.error_ctx.build_error_span(
                ErrorKind::Parse,
                token.span,
                format!("unexpected token `{}`", token.kind),
            )
        };

        if !self.expected_items.is_empty() {
            let mut expected: Vec<String> = self.expected_items.iter().map(|x| x.to_string()).collect();
            expected.sort();
            error = error.note(format!("expected {}", expected.join(", ")));
            self.expected_items.clear();
        }

        error.build()
    }

    /// `expected {what}, found {token}`, for when we know exactly what
    /// should have come next.
    fn expected_what(&mut self, what: &str) -> CompileError {
        let token = self.peek().clone();
        self.expected_items.clear();

        let found = if token.kind.is_eof() {
            "end of file".to_owned()
        } else {
            format!("`{}`", token.kind)
        };

        self.error_ctx
            .error(ErrorKind::Parse, token.span, format!("expected {}, found {}", what, found))
    }

    fn error(&self, kind: ErrorKind, span: Span, message: impl ToString) -> CompileError {
        self.error_ctx.error(kind, span, message)
    }

    /// Checks if the next token matches this expectation.
    fn check_next(&mut self, expected: Expected) -> bool {
        self.expected_items.insert(expected);
        expected.matches(&self.peek().kind)
    }

    /// Grabs a token and eats it for dinner.
    /// Returns `false` and doesn't eat the token if it's not the edible kind.
    fn eat(&mut self, kind_to_eat: Expected) -> bool {
        let res = self.check_next(kind_to_eat);

        if res {
            self.bump();
        }

        res
    }

    /// Eats the next token if its `TokenKind` matches `expected`.
    fn expect_item(&mut self, expected: Expected) -> Result<Token, CompileError> {
        if self.check_next(expected) {
            Ok(self.bump())
        } else {
            Err(self.unexpected())
        }
    }

    /// Eats an identifier. `what` names it in the error message,
    /// ex. `expected interface name, found '{'`.
    fn expect_ident(&mut self, what: &str) -> Result<Ident, CompileError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let ident = Ident::new(name.clone(), self.peek().span);
                self.bump();
                Ok(ident)
            },

            _ => Err(self.expected_what(what)),
        }
    }

    fn next_is_ident(&self, n: usize) -> bool {
        matches!(self.look(n).kind, TokenKind::Ident(_))
    }

    fn next_is_symbol(&self, n: usize, symbol: Symbol) -> bool {
        self.look(n).kind == TokenKind::Symbol(symbol)
    }

    /// Whether the next token sits on a new line.
    fn newline_before_next(&self) -> bool {
        self.peek().seen_newline
    }

    /// Runs `f` with struct literals enabled or disabled, restoring the
    /// previous setting afterwards.
    fn with_struct_literals<T>(
        &mut self,
        allowed: bool,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        let old = mem::replace(&mut self.no_struct_literal, !allowed);
        let res = f(self);
        self.no_struct_literal = old;
        res
    }

    /// The entry point for the parser.
    /// Parses a script.
    fn parse_script(&mut self) -> Result<Script, CompileError> {
        let mut res = Script::new();
        res.statements = self.parse_statement_list(Expected::Eof)?;

        if let (Some(first), Some(last)) = (res.statements.first(), res.statements.last()) {
            res.span = first.span.to(last.span);
        }

        Ok(res)
    }

    /// Parses statements until `end` (which is not consumed), applying the
    /// statement boundary rule after each one.
    fn parse_statement_list(&mut self, end: Expected) -> Result<Vec<Statement>, CompileError> {
        let mut res = Vec::new();

        loop {
            while self.eat(SEMICOLON) {}

            if self.check_next(end) {
                return Ok(res);
            }

            if self.peek().kind.is_eof() {
                return Err(self.unexpected());
            }

            let statement = self.parse_statement()?;
            let ends_with_brace = self.prev_kind == TokenKind::CloseDelim(DelimKind::Brace);
            let mut terminated = false;

            while self.eat(SEMICOLON) {
                terminated = true;
            }

            let next = self.peek();
            let boundary = terminated
                || ends_with_brace
                || next.seen_newline
                || next.kind.is_eof()
                || next.kind == TokenKind::CloseDelim(DelimKind::Brace);

            if !boundary {
                let span = next.span;

                return Err(self
                    .error_ctx
                    .build_error_span(ErrorKind::Parse, span, "expected `;` or a line break")
                    .note_label(statement.span, "after this statement")
                    .build());
            }

            res.push(statement);
        }
    }

    fn parse_block(&mut self) -> Result<Block, CompileError> {
        let start = self.expect_item(OPEN_BRACE)?.span;

        self.block_level += 1;
        let statements = self.with_struct_literals(true, |this| this.parse_statement_list(CLOSE_BRACE));
        self.block_level -= 1;
        let statements = statements?;

        let end = self.expect_item(CLOSE_BRACE)?.span;

        Ok(Block {
            statements,
            span: start.to(end),
        })
    }

    /// Parses a function body. Loops and labels of the enclosing function
    /// are not visible inside.
    fn parse_function_body(&mut self) -> Result<Block, CompileError> {
        let loop_level = mem::replace(&mut self.loop_level, 0);
        let labels = mem::take(&mut self.labels);
        self.fn_level += 1;

        let res = self.parse_block();

        self.fn_level -= 1;
        self.loop_level = loop_level;
        self.labels = labels;
        res
    }

    fn ensure_top_level(&self, span: Span, what: &str) -> Result<(), CompileError> {
        if self.block_level == 0 {
            Ok(())
        } else {
            Err(self
                .error_ctx
                .build_error_span(
                    ErrorKind::Parse,
                    span,
                    format!("{} are only allowed at the top level", what),
                )
                .build())
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, CompileError> {
        let start = self.peek().span;

        match self.peek().kind.clone() {
            TokenKind::Keyword(Keyword::Pub) => {
                self.ensure_top_level(start, "public declarations")?;
                self.bump();
                self.parse_declaration(true, start)
            },

            TokenKind::Keyword(Keyword::Fn) if !self.next_is_open_paren(1) => {
                self.parse_declaration(false, start)
            },

            TokenKind::Keyword(
                Keyword::Let
                | Keyword::Const
                | Keyword::Type
                | Keyword::Interface
                | Keyword::Struct
                | Keyword::Enum,
            ) => self.parse_declaration(false, start),

            TokenKind::Keyword(Keyword::Import) => self.parse_import(),
            TokenKind::Keyword(Keyword::Impl) => self.parse_impl(),

            TokenKind::OpenDelim(DelimKind::Brace) => {
                let block = self.parse_block()?;
                let span = block.span;
                Ok(Statement::new(StatementKind::Block(block), span))
            },

            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(None, start),

            TokenKind::Keyword(Keyword::Break | Keyword::Continue) => self.parse_break_or_continue(),

            TokenKind::Ident(_) if self.next_is_symbol(1, Symbol::Colon) => {
                let label = self.expect_ident("label")?;
                self.bump();

                if !self.check_next(Expected::Keyword(Keyword::For)) {
                    return Err(self
                        .error_ctx
                        .build_error_span(
                            ErrorKind::Parse,
                            self.peek().span,
                            format!("expected `for` after label `{}`", label),
                        )
                        .note_label(label.span, "only loops can be labelled")
                        .build());
                }

                self.parse_for(Some(label), start)
            },

            _ => {
                let expr = self.parse_expression()?;
                Ok(expr.into())
            },
        }
    }

    fn next_is_open_paren(&self, n: usize) -> bool {
        self.look(n).kind == TokenKind::OpenDelim(DelimKind::Paren)
    }

    /// Parses the declarations which may be prefixed with `pub`.
    fn parse_declaration(&mut self, public: bool, start: Span) -> Result<Statement, CompileError> {
        let kind = match self.peek().kind {
            TokenKind::Keyword(Keyword::Fn) => {
                self.ensure_top_level(start, "function declarations")?;
                StatementKind::Function(self.parse_function_decl(public)?)
            },

            TokenKind::Keyword(Keyword::Let | Keyword::Const) => {
                StatementKind::Variable(self.parse_variable_decl(public)?)
            },

            TokenKind::Keyword(Keyword::Type | Keyword::Interface | Keyword::Struct | Keyword::Enum) => {
                self.ensure_top_level(start, "type declarations")?;
                StatementKind::Type(self.parse_type_decl(public)?)
            },

            _ => {
                for keyword in &[
                    Keyword::Fn,
                    Keyword::Let,
                    Keyword::Const,
                    Keyword::Type,
                    Keyword::Interface,
                    Keyword::Struct,
                    Keyword::Enum,
                ] {
                    self.expected_items.insert(Expected::Keyword(*keyword));
                }

                return Err(self.unexpected());
            },
        };

        Ok(Statement::new(kind, start.to(self.prev_span)))
    }

    /// `import "path" as name`
    fn parse_import(&mut self) -> Result<Statement, CompileError> {
        let start = self.expect_item(Expected::Keyword(Keyword::Import))?.span;
        self.ensure_top_level(start, "imports")?;

        let path_token = self.peek().clone();
        let path = match path_token.kind {
            TokenKind::String { value, .. } => {
                self.bump();
                value
            },

            _ => return Err(self.expected_what("import path")),
        };

        self.expect_item(Expected::Keyword(Keyword::As))?;
        let alias = self.expect_ident("module name")?;
        let span = start.to(alias.span);

        Ok(Statement::new(
            StatementKind::Import(Import {
                path,
                path_span: path_token.span,
                alias,
            }),
            span,
        ))
    }

    /// `fn name(params) -> T { ... }` or `fn Target name(...) ...`
    fn parse_function_decl(&mut self, public: bool) -> Result<FunctionDecl, CompileError> {
        self.expect_item(Expected::Keyword(Keyword::Fn))?;
        let first = self.expect_ident("function name")?;

        let (target, name) = if self.next_is_ident(0) {
            (Some(first), self.expect_ident("method name")?)
        } else {
            (None, first)
        };

        let signature = self.parse_signature(true)?;
        let body = self.parse_function_body()?;

        Ok(FunctionDecl {
            public,
            target,
            name,
            signature,
            body,
        })
    }

    /// `impl Target { fn a() {} fn b() {} }`
    fn parse_impl(&mut self) -> Result<Statement, CompileError> {
        let start = self.expect_item(Expected::Keyword(Keyword::Impl))?.span;
        self.ensure_top_level(start, "impl blocks")?;

        let target = self.expect_ident("type name")?;
        self.expect_item(OPEN_BRACE)?;
        let mut methods = Vec::new();

        loop {
            while self.eat(SEMICOLON) {}

            if self.check_next(CLOSE_BRACE) {
                break;
            }

            if !self.check_next(Expected::Keyword(Keyword::Fn)) {
                return Err(self.expected_what("method"));
            }

            methods.push(self.parse_function_decl(false)?);
        }

        let end = self.expect_item(CLOSE_BRACE)?.span;

        Ok(Statement::new(
            StatementKind::Impl(ImplBlock { target, methods }),
            start.to(end),
        ))
    }

    /// `let x: T = e` or `const x = e`.
    fn parse_variable_decl(&mut self, public: bool) -> Result<VariableDecl, CompileError> {
        let keyword = self.bump();
        let constant = keyword.kind == TokenKind::Keyword(Keyword::Const);
        let name = self.expect_ident("variable name")?;

        let kind = if self.eat(COLON) {
            Some(self.parse_kind_expr_with(true)?)
        } else {
            None
        };

        let init = if self.eat(Expected::Symbol(Symbol::Equals)) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        if init.is_none() {
            let span = keyword.span.to(self.prev_span);

            if constant {
                return Err(self
                    .error_ctx
                    .build_error_span(ErrorKind::Parse, span, format!("constant `{}` needs a value", name))
                    .help(format!("try `const {} = ...`", name))
                    .build());
            }

            match &kind {
                None => {
                    return Err(self
                        .error_ctx
                        .build_error_span(
                            ErrorKind::Parse,
                            span,
                            format!("variable `{}` needs a type or an initial value", name),
                        )
                        .help(format!("try `let {}: number` or `let {} = 0`", name, name))
                        .build());
                },

                Some(KindExpr {
                    kind: KindExprKind::Array(_, ArrayLength::Inferred),
                    span,
                }) => {
                    return Err(self
                        .error_ctx
                        .build_error_span(
                            ErrorKind::Parse,
                            *span,
                            "an array of inferred length needs an initial value",
                        )
                        .help("give the length explicitly, ex. `[3]number`, or use a vector `[..]number`")
                        .build());
                },

                Some(_) => {},
            }
        }

        Ok(VariableDecl {
            public,
            constant,
            name,
            kind,
            init,
        })
    }

    fn parse_type_decl(&mut self, public: bool) -> Result<TypeDecl, CompileError> {
        let keyword = self.bump();

        match keyword.kind {
            TokenKind::Keyword(Keyword::Interface) => {
                let name = self.expect_ident("interface name")?;
                let extends = self.parse_extends()?;
                self.expect_item(OPEN_BRACE)?;
                let props = self.parse_props(true)?;
                self.expect_item(CLOSE_BRACE)?;

                Ok(TypeDecl {
                    public,
                    name,
                    body: TypeBody::Interface { extends, props },
                })
            },

            TokenKind::Keyword(Keyword::Enum) => {
                let name = self.expect_ident("enum name")?;
                self.expect_item(OPEN_BRACE)?;
                let choices = self.parse_enum_choices()?;
                self.expect_item(CLOSE_BRACE)?;

                Ok(TypeDecl {
                    public,
                    name,
                    body: TypeBody::Enum(choices),
                })
            },

            TokenKind::Keyword(Keyword::Struct) => {
                let name = self.expect_ident("struct name")?;
                let body = self.parse_struct_or_enum(&name, false)?;

                Ok(TypeDecl { public, name, body })
            },

            _ => {
                let name = self.expect_ident("type name")?;

                let body = if self.eat(Expected::Symbol(Symbol::Equals)) {
                    TypeBody::Alias(self.parse_kind_expr()?)
                } else if self.check_next(OPEN_BRACE) || self.check_next(COLON) || self.next_is_extends() {
                    self.parse_struct_or_enum(&name, true)?
                } else {
                    TypeBody::Alias(self.parse_kind_expr()?)
                };

                Ok(TypeDecl { public, name, body })
            },
        }
    }

    /// `extends` is an ordinary identifier everywhere else.
    fn next_is_extends(&self) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(name) if name == "extends")
    }

    /// Parses `extends A, B` if present.
    fn parse_extends(&mut self) -> Result<Vec<KindExpr>, CompileError> {
        let mut res = Vec::new();

        if self.next_is_extends() {
            self.bump();

            loop {
                res.push(self.parse_kind_expr()?);

                if !self.eat(COMMA) {
                    break;
                }
            }
        }

        Ok(res)
    }

    /// Parses what follows `type Name`: `[: I] [extends A, B] { ... }`.
    /// The body is an enum when it lists bare names.
    fn parse_struct_or_enum(&mut self, name: &Ident, allow_enum: bool) -> Result<TypeBody, CompileError> {
        let implements = if self.eat(COLON) {
            Some(self.parse_kind_expr()?)
        } else {
            None
        };

        let extends = self.parse_extends()?;
        self.expect_item(OPEN_BRACE)?;

        let is_enum = allow_enum
            && self.next_is_ident(0)
            && !self.next_is_symbol(1, Symbol::Colon)
            && !self.next_is_open_paren(1);

        let body = if is_enum {
            if implements.is_some() || !extends.is_empty() {
                return Err(self
                    .error_ctx
                    .build_error_span(
                        ErrorKind::EnumWithExtras,
                        name.span,
                        format!("enum `{}` cannot implement or extend other types", name),
                    )
                    .help("only structs may have `:` and `extends` clauses")
                    .build());
            }

            TypeBody::Enum(self.parse_enum_choices()?)
        } else {
            TypeBody::Struct {
                implements,
                extends,
                props: self.parse_props(false)?,
            }
        };

        self.expect_item(CLOSE_BRACE)?;
        Ok(body)
    }

    /// Checks that a list item is followed by `,`, a line break or `}`.
    /// Eats the comma.
    fn end_list_item(&mut self) -> Result<(), CompileError> {
        if self.eat(COMMA) || self.check_next(CLOSE_BRACE) || self.newline_before_next() {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_enum_choices(&mut self) -> Result<Vec<Ident>, CompileError> {
        let mut res = Vec::new();

        while !self.check_next(CLOSE_BRACE) {
            res.push(self.expect_ident("enum choice")?);
            self.end_list_item()?;
        }

        Ok(res)
    }

    /// Parses `name: kind` pairs up to (not including) `}`.
    /// Interfaces may also use the method form `name(params) -> T`.
    pub(super) fn parse_props(&mut self, allow_methods: bool) -> Result<Vec<Property>, CompileError> {
        let mut res = Vec::new();

        while !self.check_next(CLOSE_BRACE) {
            let name = self.expect_ident("property name")?;

            let kind = if allow_methods && self.next_is_open_paren(0) {
                let signature = self.parse_signature(false)?;
                let span = signature.span;
                KindExpr::new(KindExprKind::Function(signature), span)
            } else {
                self.expect_item(COLON)?;
                self.parse_kind_expr()?
            };

            res.push(Property { name, kind });
            self.end_list_item()?;
        }

        Ok(res)
    }

    /// Parses `(params) [-> T]`. Declarations must name their parameters.
    pub(super) fn parse_signature(&mut self, require_names: bool) -> Result<FunctionSignature, CompileError> {
        let start = self.expect_item(Expected::OpenDelim(DelimKind::Paren))?.span;
        let mut params: Vec<Param> = Vec::new();

        while !self.check_next(Expected::CloseDelim(DelimKind::Paren)) {
            if let Some(last) = params.last().filter(|param| param.rest) {
                let span = last.kind.span;

                return Err(self
                    .error_ctx
                    .build_error_span(ErrorKind::Parse, self.peek().span, "unexpected parameter after a rest parameter")
                    .note_label(span, "the rest parameter must come last")
                    .build());
            }

            let rest = self.eat(Expected::Symbol(Symbol::DotDot));

            let name = if require_names || (self.next_is_ident(0) && self.next_is_symbol(1, Symbol::Colon)) {
                let name = self.expect_ident("parameter name")?;
                self.expect_item(COLON)?;
                Some(name)
            } else {
                None
            };

            let kind = self.parse_kind_expr()?;
            params.push(Param { name, kind, rest });

            if !self.eat(COMMA) && !self.check_next(Expected::CloseDelim(DelimKind::Paren)) {
                return Err(self.unexpected());
            }
        }

        let mut span = start.to(self.expect_item(Expected::CloseDelim(DelimKind::Paren))?.span);

        let ret = if self.eat(Expected::Symbol(Symbol::Arrow)) {
            let kind = self.parse_kind_expr()?;
            span.grow_to_contain(&kind.span);
            Some(Box::new(kind))
        } else {
            None
        };

        Ok(FunctionSignature { params, ret, span })
    }

    fn parse_return(&mut self) -> Result<Statement, CompileError> {
        let start = self.expect_item(Expected::Keyword(Keyword::Return))?.span;

        if self.fn_level == 0 {
            return Err(self.error(ErrorKind::Parse, start, "`return` outside of a function"));
        }

        let next = self.peek();
        let has_value = !(next.seen_newline
            || next.kind.is_eof()
            || next.kind == TokenKind::Symbol(Symbol::Semicolon)
            || next.kind == TokenKind::CloseDelim(DelimKind::Brace));

        let value = if has_value {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Statement::new(StatementKind::Return(value), start.to(self.prev_span)))
    }

    /// Parses an `if` condition or a `for` header expression, where `{`
    /// starts the body instead of a struct literal.
    fn parse_header_expression(&mut self) -> Result<Expression, CompileError> {
        self.with_struct_literals(false, |this| this.parse_expression())
    }

    fn parse_if(&mut self) -> Result<Statement, CompileError> {
        let start = self.expect_item(Expected::Keyword(Keyword::If))?.span;

        if self.check_next(OPEN_BRACE) {
            return Err(self.error(ErrorKind::Parse, start, "`if` condition cannot be empty"));
        }

        let cond = self.parse_header_expression()?;
        let then = self.parse_block()?;

        let otherwise = if self.eat(Expected::Keyword(Keyword::Else)) {
            if self.check_next(Expected::Keyword(Keyword::If)) {
                Some(Box::new(self.parse_if()?))
            } else {
                let block = self.parse_block()?;
                let span = block.span;
                Some(Box::new(Statement::new(StatementKind::Block(block), span)))
            }
        } else {
            None
        };

        Ok(Statement::new(
            StatementKind::If(IfStatement {
                cond,
                then,
                otherwise,
            }),
            start.to(self.prev_span),
        ))
    }

    /// Parses a `let` or an expression, for the first and last parts of
    /// a C-style `for` header.
    fn parse_simple_statement(&mut self) -> Result<Statement, CompileError> {
        let start = self.peek().span;

        if self.check_next(Expected::Keyword(Keyword::Let)) || self.check_next(Expected::Keyword(Keyword::Const)) {
            let decl = self.parse_variable_decl(false)?;
            Ok(Statement::new(StatementKind::Variable(decl), start.to(self.prev_span)))
        } else {
            Ok(self.parse_expression()?.into())
        }
    }

    fn parse_for(&mut self, label: Option<Ident>, start: Span) -> Result<Statement, CompileError> {
        self.expect_item(Expected::Keyword(Keyword::For))?;

        // `for l: for { ... }` labels the inner loop
        if self.next_is_ident(0)
            && self.next_is_symbol(1, Symbol::Colon)
            && self.look(2).kind == TokenKind::Keyword(Keyword::For)
        {
            let inner_label = self.expect_ident("label")?;

            if let Some(label) = label {
                return Err(self
                    .error_ctx
                    .build_error_span(ErrorKind::Parse, inner_label.span, "a loop can only have one label")
                    .note_label(label.span, "first label given here")
                    .build());
            }

            self.bump();
            return self.parse_for(Some(inner_label), start);
        }

        let kind = self.with_struct_literals(false, |this| this.parse_for_header())?;

        self.loop_level += 1;
        if let Some(label) = &label {
            self.labels.push(label.name.clone());
        }

        let body = self.parse_block();

        if label.is_some() {
            self.labels.pop();
        }
        self.loop_level -= 1;

        let body = body?;
        let span = start.to(body.span);

        Ok(Statement::new(StatementKind::For(ForStatement { label, kind, body }), span))
    }

    fn parse_for_header(&mut self) -> Result<ForKind, CompileError> {
        if self.check_next(OPEN_BRACE) {
            return Ok(ForKind::Infinite);
        }

        // `for x : target` or `for x, i : target`
        let iterate = self.next_is_ident(0)
            && (self.next_is_symbol(1, Symbol::Colon)
                || (self.next_is_symbol(1, Symbol::Comma)
                    && self.next_is_ident(2)
                    && self.next_is_symbol(3, Symbol::Colon)));

        if iterate {
            let element = self.expect_ident("loop variable")?;

            let index = if self.eat(COMMA) {
                Some(self.expect_ident("index variable")?)
            } else {
                None
            };

            self.expect_item(COLON)?;
            let target = self.parse_expression()?;

            return Ok(ForKind::Iterate {
                element,
                index,
                target,
            });
        }

        let init = if self.check_next(SEMICOLON) {
            None
        } else {
            Some(self.parse_simple_statement()?)
        };

        if !self.eat(SEMICOLON) {
            return match init.map(|init| init.kind) {
                Some(StatementKind::Expression(cond)) => Ok(ForKind::While(cond)),
                _ => Err(self.unexpected()),
            };
        }

        let cond = if self.check_next(SEMICOLON) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.expect_item(SEMICOLON)?;

        let update = if self.check_next(OPEN_BRACE) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };

        Ok(ForKind::CStyle {
            init: init.map(Box::new),
            cond,
            update,
        })
    }

    fn parse_break_or_continue(&mut self) -> Result<Statement, CompileError> {
        let keyword = self.bump();
        let is_break = keyword.kind == TokenKind::Keyword(Keyword::Break);
        let word = if is_break { "break" } else { "continue" };

        let label = if self.next_is_ident(0) && !self.newline_before_next() {
            Some(self.expect_ident("label")?)
        } else {
            None
        };

        if self.loop_level == 0 {
            return Err(self
                .error_ctx
                .build_error_span(
                    ErrorKind::LabelNotInLoop,
                    keyword.span,
                    format!("`{}` outside of a loop", word),
                )
                .build());
        }

        if let Some(label) = &label {
            if !self.labels.contains(&label.name) {
                return Err(self
                    .error_ctx
                    .build_error_span(
                        ErrorKind::LabelNotInLoop,
                        label.span,
                        format!("no enclosing loop is labelled `{}`", label),
                    )
                    .build());
            }
        }

        let span = keyword.span.to(self.prev_span);
        let kind = if is_break {
            StatementKind::Break(label)
        } else {
            StatementKind::Continue(label)
        };

        Ok(Statement::new(kind, span))
    }
}

/// Parses a whole source file, pulling tokens from the lexer as it goes.
pub fn parse(source: &SourceBuffer) -> Result<Script, CompileError> {
    let mut parser = Parser::new(source);
    let res = parser.parse_script();

    // The parser only saw tokens up to the lex error, so a parse error
    // only stands if it comes first
    match (res, parser.lex_error.take()) {
        (Err(err), Some(lex_error)) if err.span.start < lex_error.span.start => Err(err),
        (_, Some(lex_error)) => Err(lex_error),
        (res, None) => res,
    }
}
