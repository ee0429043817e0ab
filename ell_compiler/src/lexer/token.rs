use std::fmt;

use super::keyword::{Constant, Keyword};
use crate::errors::Span;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DelimKind {
    /// `{` or `}`
    Brace,
    /// `(` or `)`
    Paren,
    /// `[` or `]`
    Bracket,
}

impl DelimKind {
    /// Returns `&'static str` corresponding to an opening delimiter
    pub const fn open_as_str(&self) -> &'static str {
        match self {
            DelimKind::Brace => "{",
            DelimKind::Paren => "(",
            DelimKind::Bracket => "[",
        }
    }

    /// Returns `&'static str` corresponding to a closing delimiter
    pub const fn close_as_str(&self) -> &'static str {
        match self {
            DelimKind::Brace => "}",
            DelimKind::Paren => ")",
            DelimKind::Bracket => "]",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Symbol {
    /// `->`
    Arrow,
    /// `..`
    DotDot,
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `=`
    Equals,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*` as multiplication
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `==`
    DoubleEquals,
    /// `!=`
    ExclEqual,
    /// `&&`
    AndAnd,
    /// `||`
    PipePipe,
    /// `!`
    Exclamation,
    /// `&` as bitwise and
    And,
    /// `|`
    Pipe,
    /// `~`
    Tilde,
    /// `^`
    Caret,
    /// `.`
    Dot,
    /// `&` in front of an expression
    AddressOf,
    /// `*` in front of an expression
    Deref,
    /// `++`
    PlusPlus,
    /// `--`
    MinusMinus,
}

impl Symbol {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Symbol::Arrow => "->",
            Symbol::DotDot => "..",
            Symbol::Semicolon => ";",
            Symbol::Colon => ":",
            Symbol::Comma => ",",
            Symbol::Equals => "=",
            Symbol::Plus => "+",
            Symbol::Minus => "-",
            Symbol::Star | Symbol::Deref => "*",
            Symbol::Slash => "/",
            Symbol::Percent => "%",
            Symbol::Less => "<",
            Symbol::LessEqual => "<=",
            Symbol::Greater => ">",
            Symbol::GreaterEqual => ">=",
            Symbol::DoubleEquals => "==",
            Symbol::ExclEqual => "!=",
            Symbol::AndAnd => "&&",
            Symbol::PipePipe => "||",
            Symbol::Exclamation => "!",
            Symbol::And | Symbol::AddressOf => "&",
            Symbol::Pipe => "|",
            Symbol::Tilde => "~",
            Symbol::Caret => "^",
            Symbol::Dot => ".",
            Symbol::PlusPlus => "++",
            Symbol::MinusMinus => "--",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// End of input. The lexer keeps returning it once reached.
    Eof,
    /// ex. `fn`, `impl`
    Keyword(Keyword),
    /// ex. `true`, `self`
    Const(Constant),
    /// ex. `reimu`, `$marisa_2`
    Ident(String),
    /// ex. `1`, `1.5`
    Number(f64),
    /// ex. `"Hello\n"`, `"""raw"""`
    String { value: String, raw: bool },
    /// ex. `'a'`
    Char(char),
    /// ex. `(`, `{`
    OpenDelim(DelimKind),
    /// ex. `)`, `}`
    CloseDelim(DelimKind),
    /// ex. `+`, `-`, `==`
    Symbol(Symbol),
}

/// Per-kind metadata consulted by both the lexer and the parser.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TokenMeta {
    /// Binding strength when used as an operator, `0` if it isn't one.
    pub precedence: u8,
    /// Whether a lexeme following this token may start an expression,
    /// which turns `&` and `*` into prefix operators.
    pub allow_expr: bool,
}

impl TokenMeta {
    const fn new(precedence: u8, allow_expr: bool) -> Self {
        Self {
            precedence,
            allow_expr,
        }
    }
}

impl TokenKind {
    /// The single token-meta table.
    pub const fn meta(&self) -> TokenMeta {
        match self {
            TokenKind::Eof | TokenKind::Keyword(_) => TokenMeta::new(0, true),

            TokenKind::Const(_)
            | TokenKind::Ident(_)
            | TokenKind::Number(_)
            | TokenKind::String { .. }
            | TokenKind::Char(_) => TokenMeta::new(0, false),

            TokenKind::OpenDelim(DelimKind::Brace) => TokenMeta::new(0, true),
            TokenKind::OpenDelim(_) => TokenMeta::new(18, true),
            TokenKind::CloseDelim(_) => TokenMeta::new(0, false),

            TokenKind::Symbol(symbol) => match symbol {
                Symbol::Dot => TokenMeta::new(18, true),

                Symbol::PlusPlus | Symbol::MinusMinus => TokenMeta::new(17, false),

                Symbol::Exclamation | Symbol::Tilde | Symbol::AddressOf | Symbol::Deref => {
                    TokenMeta::new(17, true)
                },

                Symbol::Star | Symbol::Slash | Symbol::Percent => TokenMeta::new(13, true),
                Symbol::Plus | Symbol::Minus => TokenMeta::new(12, true),

                Symbol::Less | Symbol::LessEqual | Symbol::Greater | Symbol::GreaterEqual => {
                    TokenMeta::new(10, true)
                },

                Symbol::DoubleEquals | Symbol::ExclEqual => TokenMeta::new(9, true),
                Symbol::And => TokenMeta::new(8, true),
                Symbol::Caret => TokenMeta::new(7, true),
                Symbol::Pipe => TokenMeta::new(6, true),
                Symbol::AndAnd => TokenMeta::new(5, true),
                Symbol::PipePipe => TokenMeta::new(4, true),
                Symbol::Equals => TokenMeta::new(2, true),

                Symbol::Arrow
                | Symbol::DotDot
                | Symbol::Semicolon
                | Symbol::Colon
                | Symbol::Comma => TokenMeta::new(0, true),
            },
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, TokenKind::Eof)
    }
}

/// Escapes `value` so that it can be put back between `quote`s.
pub(crate) fn escape(value: &str, quote: char) -> String {
    let mut res = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '\\' => res.push_str("\\\\"),
            '\n' => res.push_str("\\n"),
            '\r' => res.push_str("\\r"),
            '\t' => res.push_str("\\t"),
            _ if c == quote => {
                res.push('\\');
                res.push(c);
            },
            _ if (c as u32) < 0x20 || c == '\u{7f}' => {
                res.push_str(&format!("\\x{:02x}", c as u32));
            },
            _ => res.push(c),
        }
    }

    res
}

// Primarily implemented for `to_string`
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eof => write!(f, "end of file"),
            Self::Keyword(keyword) => write!(f, "{}", keyword),
            Self::Const(constant) => write!(f, "{}", constant),
            Self::Ident(id) => write!(f, "{}", id),
            Self::Number(n) => write!(f, "{}", n),
            Self::String { value, raw: true } => write!(f, "\"\"\"{}\"\"\"", value),
            Self::String { value, raw: false } => write!(f, "\"{}\"", escape(value, '"')),
            Self::Char(c) => write!(f, "'{}'", escape(&c.to_string(), '\'')),
            Self::OpenDelim(kind) => write!(f, "{}", kind.open_as_str()),
            Self::CloseDelim(kind) => write!(f, "{}", kind.close_as_str()),
            Self::Symbol(symbol) => write!(f, "{}", symbol),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Whether the trivia before this token contained a line break.
    pub seen_newline: bool,
}

impl Token {
    pub const fn new(kind: TokenKind, span: Span, seen_newline: bool) -> Self {
        Self {
            kind,
            span,
            seen_newline,
        }
    }
}
