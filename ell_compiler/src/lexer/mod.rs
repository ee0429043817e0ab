pub mod keyword;
pub mod token;

#[cfg(test)]
mod tests;

use ell_log::trace;

use self::{
    keyword::{Constant, Keyword},
    token::{DelimKind, Symbol, Token, TokenKind},
};
use crate::errors::{CompileError, DiagnosticsContext, ErrorKind, SourceBuffer, Span};

const fn is_ident_start(c: char) -> bool {
    matches!(c, 'A'..='Z' | 'a'..='z' | '_' | '$')
}

const fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

/// Produces tokens on demand from a source buffer.
pub struct Lexer<'src> {
    chars: &'src [char],
    pos: usize,
    seen_newline: bool,
    allow_expr: bool,
    error_ctx: DiagnosticsContext<'src>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src SourceBuffer) -> Self {
        Self {
            chars: source.chars(),
            pos: 0,
            seen_newline: false,
            allow_expr: true,
            error_ctx: DiagnosticsContext::new(source),
        }
    }

    /// Returns the `n`-th code point ahead without consuming anything.
    /// `look(0)` is the next character to be lexed.
    pub fn look(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    /// Whether the trivia skipped by the last call to [`next`](Lexer::next)
    /// contained a line break.
    pub fn seen_newline(&self) -> bool {
        self.seen_newline
    }

    /// Whether the next lexeme may begin an expression.
    pub fn allow_expr(&self) -> bool {
        self.allow_expr
    }

    fn peek(&self) -> Option<char> {
        self.look(0)
    }

    fn bump(&mut self) -> Option<char> {
        let res = self.peek();

        if res.is_some() {
            self.pos += 1;
        }

        res
    }

    fn error(&self, span: Span, message: impl ToString) -> CompileError {
        self.error_ctx.error(ErrorKind::Lex, span, message)
    }

    /// Skips whitespace and comments, recording line breaks.
    fn skip_trivia(&mut self) -> Result<(), CompileError> {
        loop {
            match (self.look(0), self.look(1)) {
                (Some(' ' | '\t'), _) => {
                    self.pos += 1;
                },

                (Some('\n' | '\r'), _) => {
                    self.seen_newline = true;
                    self.pos += 1;
                },

                (Some('/'), Some('/')) => {
                    while !matches!(self.peek(), None | Some('\n' | '\r')) {
                        self.pos += 1;
                    }
                },

                (Some('/'), Some('*')) => {
                    let start = self.pos;
                    self.pos += 2;

                    loop {
                        match (self.look(0), self.look(1)) {
                            (Some('*'), Some('/')) => {
                                self.pos += 2;
                                break;
                            },

                            (Some(c), _) => {
                                if matches!(c, '\n' | '\r') {
                                    self.seen_newline = true;
                                }

                                self.pos += 1;
                            },

                            (None, _) => {
                                return Err(self
                                    .error_ctx
                                    .build_error_span(
                                        ErrorKind::Lex,
                                        Span::new(start, start + 2),
                                        "unterminated block comment",
                                    )
                                    .help("block comments end with `*/` and do not nest")
                                    .build());
                            },
                        }
                    }
                },

                _ => return Ok(()),
            }
        }
    }

    /// Lexes the next token. Once the input is exhausted this keeps
    /// returning [`TokenKind::Eof`].
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Token, CompileError> {
        self.seen_newline = false;
        self.skip_trivia()?;

        let start = self.pos;
        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some(c) => self.lex_one_token(c)?,
        };

        self.allow_expr = kind.meta().allow_expr;
        let token = Token::new(kind, Span::new(start, self.pos), self.seen_newline);
        trace!("lexed `{}` at {}", token.kind, token.span);

        Ok(token)
    }

    /// Consumes the current character and yields `kind`.
    fn one_char(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    /// Consumes the current character. If it is followed by `next_char`,
    /// consumes that too and yields `both`, otherwise yields `one`.
    fn maybe_two_char(&mut self, next_char: char, both: Symbol, one: Symbol) -> TokenKind {
        self.pos += 1;

        if self.peek() == Some(next_char) {
            self.pos += 1;
            TokenKind::Symbol(both)
        } else {
            TokenKind::Symbol(one)
        }
    }

    fn lex_one_token(&mut self, c: char) -> Result<TokenKind, CompileError> {
        let kind = match c {
            _ if is_ident_start(c) => self.consume_ident_or_keyword(),
            '0'..='9' => self.consume_number()?,
            '"' => self.consume_string()?,
            '\'' => self.consume_char()?,

            '(' => self.one_char(TokenKind::OpenDelim(DelimKind::Paren)),
            ')' => self.one_char(TokenKind::CloseDelim(DelimKind::Paren)),
            '{' => self.one_char(TokenKind::OpenDelim(DelimKind::Brace)),
            '}' => self.one_char(TokenKind::CloseDelim(DelimKind::Brace)),
            '[' => self.one_char(TokenKind::OpenDelim(DelimKind::Bracket)),
            ']' => self.one_char(TokenKind::CloseDelim(DelimKind::Bracket)),

            ',' => self.one_char(TokenKind::Symbol(Symbol::Comma)),
            ';' => self.one_char(TokenKind::Symbol(Symbol::Semicolon)),
            ':' => self.one_char(TokenKind::Symbol(Symbol::Colon)),
            '/' => self.one_char(TokenKind::Symbol(Symbol::Slash)),
            '%' => self.one_char(TokenKind::Symbol(Symbol::Percent)),
            '^' => self.one_char(TokenKind::Symbol(Symbol::Caret)),
            '~' => self.one_char(TokenKind::Symbol(Symbol::Tilde)),

            '=' => self.maybe_two_char('=', Symbol::DoubleEquals, Symbol::Equals),
            '!' => self.maybe_two_char('=', Symbol::ExclEqual, Symbol::Exclamation),
            '<' => self.maybe_two_char('=', Symbol::LessEqual, Symbol::Less),
            '>' => self.maybe_two_char('=', Symbol::GreaterEqual, Symbol::Greater),
            '|' => self.maybe_two_char('|', Symbol::PipePipe, Symbol::Pipe),
            '.' => self.maybe_two_char('.', Symbol::DotDot, Symbol::Dot),
            '+' => self.maybe_two_char('+', Symbol::PlusPlus, Symbol::Plus),

            '-' => match self.look(1) {
                Some('>') => self.maybe_two_char('>', Symbol::Arrow, Symbol::Minus),
                _ => self.maybe_two_char('-', Symbol::MinusMinus, Symbol::Minus),
            },

            // `&` and `*` are prefix operators wherever an expression may start
            '&' if self.allow_expr => self.one_char(TokenKind::Symbol(Symbol::AddressOf)),
            '&' => self.maybe_two_char('&', Symbol::AndAnd, Symbol::And),
            '*' if self.allow_expr => self.one_char(TokenKind::Symbol(Symbol::Deref)),
            '*' => self.one_char(TokenKind::Symbol(Symbol::Star)),

            _ => {
                let span = Span::new(self.pos, self.pos + 1);
                return Err(self.error(span, format!("unexpected character `{}`", c)));
            },
        };

        Ok(kind)
    }

    /// Take every character that could be considered part of an identifier
    /// and produce a keyword, constant or identifier.
    fn consume_ident_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;

        while self.peek().map_or(false, is_ident_continue) {
            self.pos += 1;
        }

        let res: String = self.chars[start..self.pos].iter().collect();

        if let Some(keyword) = Keyword::from_str(&res) {
            TokenKind::Keyword(keyword)
        } else if let Some(constant) = Constant::from_str(&res) {
            TokenKind::Const(constant)
        } else {
            TokenKind::Ident(res)
        }
    }

    /// Take every character that could be considered part of a number.
    /// A `.` is only part of the number when a digit follows it, so `1..2`
    /// stays a range of two numbers.
    fn consume_number(&mut self) -> Result<TokenKind, CompileError> {
        let start = self.pos;

        while matches!(self.peek(), Some('0'..='9')) {
            self.pos += 1;
        }

        if self.peek() == Some('.') && matches!(self.look(1), Some('0'..='9')) {
            self.pos += 1;

            while matches!(self.peek(), Some('0'..='9')) {
                self.pos += 1;
            }

            if self.peek() == Some('.') && matches!(self.look(1), Some('0'..='9')) {
                let span = Span::new(start, self.pos + 1);
                return Err(self
                    .error_ctx
                    .build_error_span(ErrorKind::Lex, span, "malformed number")
                    .note("a number may contain only one `.`")
                    .build());
            }
        }

        if self.peek().map_or(false, is_ident_start) {
            let span = Span::new(start, self.pos + 1);
            return Err(self.error(span, "malformed number"));
        }

        let num_str: String = self.chars[start..self.pos].iter().collect();

        match num_str.parse::<f64>() {
            Ok(res) => Ok(TokenKind::Number(res)),

            Err(err) => Err(self
                .error_ctx
                .build_error_span(
                    ErrorKind::Lex,
                    Span::new(start, self.pos),
                    format!("could not parse {} as a number", num_str),
                )
                .note(format!("str::parse says: {}", err))
                .build()),
        }
    }

    /// Lexes the escape sequence whose `\` sits at `backslash`.
    /// The backslash has already been consumed.
    fn consume_escape(&mut self, backslash: usize) -> Result<Option<char>, CompileError> {
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(None),
        };

        let res = match c {
            'a' => '\u{07}',
            'b' => '\u{08}',
            'f' => '\u{0c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\u{0b}',

            'x' => {
                let digits = (self.look(0), self.look(1));

                match digits {
                    (Some(hi), Some(lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                        self.pos += 2;
                        let value = hi.to_digit(16).unwrap_or(0) * 16 + lo.to_digit(16).unwrap_or(0);
                        char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
                    },

                    _ => {
                        let span = Span::new(backslash, self.pos);
                        return Err(self
                            .error_ctx
                            .build_error_span(ErrorKind::Lex, span, "invalid hex escape")
                            .help("`\\x` must be followed by exactly two hex digits")
                            .build());
                    },
                }
            },

            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0);

                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            self.pos += 1;
                        },

                        None => break,
                    }
                }

                char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
            },

            // `\\`, `\'`, `\"`, `\?` and unknown escapes all stand for themselves
            _ => c,
        };

        Ok(Some(res))
    }

    /// Lexes `"..."` and `"""..."""` strings.
    fn consume_string(&mut self) -> Result<TokenKind, CompileError> {
        let start = self.pos;

        if self.look(1) == Some('"') && self.look(2) == Some('"') {
            return self.consume_raw_string();
        }

        // Discard the opening quote
        self.pos += 1;
        let mut res = String::new();

        loop {
            let idx = self.pos;

            match self.bump() {
                Some('"') => break,

                Some('\\') => match self.consume_escape(idx)? {
                    Some(c) => res.push(c),
                    None => return Err(self.error(Span::new(start, self.pos), "unterminated string")),
                },

                Some('\n' | '\r') => {
                    return Err(self
                        .error_ctx
                        .build_error_span(ErrorKind::Lex, Span::new(start, idx), "unterminated string")
                        .help("use a raw string (`\"\"\"...\"\"\"`) for text spanning lines")
                        .build());
                },

                Some(c) => res.push(c),
                None => return Err(self.error(Span::new(start, self.pos), "unterminated string")),
            }
        }

        Ok(TokenKind::String {
            value: res,
            raw: false,
        })
    }

    fn consume_raw_string(&mut self) -> Result<TokenKind, CompileError> {
        let start = self.pos;
        self.pos += 3;
        let content_start = self.pos;

        loop {
            match (self.look(0), self.look(1), self.look(2)) {
                (Some('"'), Some('"'), Some('"')) => break,
                (Some(_), _, _) => self.pos += 1,

                (None, _, _) => {
                    return Err(self.error(Span::new(start, start + 3), "unterminated string"));
                },
            }
        }

        let value = self.chars[content_start..self.pos].iter().collect();
        self.pos += 3;

        Ok(TokenKind::String { value, raw: true })
    }

    /// Lexes `'c'` char literals, which use the same escapes as strings.
    fn consume_char(&mut self) -> Result<TokenKind, CompileError> {
        let start = self.pos;
        self.pos += 1;
        let idx = self.pos;

        let value = match self.bump() {
            Some('\\') => self.consume_escape(idx)?,
            Some('\'' | '\n' | '\r') | None => None,
            Some(c) => Some(c),
        };

        match (value, self.peek()) {
            (Some(c), Some('\'')) => {
                self.pos += 1;
                Ok(TokenKind::Char(c))
            },

            _ => Err(self
                .error_ctx
                .build_error_span(ErrorKind::Lex, Span::new(start, self.pos), "malformed char literal")
                .help("char literals hold exactly one character, like `'a'` or `'\\n'`")
                .build()),
        }
    }
}

/// Lexes the whole buffer, ending with (and including) the EOF token.
pub fn tokenize(source: &SourceBuffer) -> Result<Vec<Token>, CompileError> {
    let mut lexer = Lexer::new(source);
    let mut res = Vec::new();

    loop {
        let token = lexer.next()?;
        let done = token.kind.is_eof();
        res.push(token);

        if done {
            return Ok(res);
        }
    }
}
