use std::fmt;

use crate::lexer::{
    keyword::{Constant, Keyword},
    token::{DelimKind, Symbol, TokenKind},
};

/// Something the parser was looking for, kept around for diagnostics.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(super) enum Expected {
    Keyword(Keyword),
    Const(Constant),
    Ident,
    Expression,
    Kind,
    String,
    Number,
    Block,
    OpenDelim(DelimKind),
    CloseDelim(DelimKind),
    Symbol(Symbol),
    Eof,
}

impl Expected {
    pub(super) fn matches(&self, token_kind: &TokenKind) -> bool {
        match token_kind {
            TokenKind::Keyword(keyword) => self == &Self::Keyword(*keyword),
            TokenKind::Const(constant) => self == &Self::Const(*constant),
            TokenKind::Ident(_) => self == &Self::Ident,
            TokenKind::String { .. } => self == &Self::String,
            TokenKind::Number(_) => self == &Self::Number,
            TokenKind::OpenDelim(DelimKind::Brace) => {
                matches!(self, Self::Block | Self::OpenDelim(DelimKind::Brace))
            },
            TokenKind::OpenDelim(kind) => self == &Self::OpenDelim(*kind),
            TokenKind::CloseDelim(kind) => self == &Self::CloseDelim(*kind),
            TokenKind::Symbol(symbol) => self == &Self::Symbol(*symbol),
            TokenKind::Eof => self == &Self::Eof,
            TokenKind::Char(_) => false,
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Keyword(kw) => write!(f, "`{}`", kw),
            Expected::Const(constant) => write!(f, "`{}`", constant),
            Expected::Ident => write!(f, "identifier"),
            Expected::Expression => write!(f, "expression"),
            Expected::Kind => write!(f, "type"),
            Expected::String => write!(f, "string literal"),
            Expected::Number => write!(f, "number literal"),
            Expected::Block => write!(f, "block"),
            Expected::OpenDelim(kind) => write!(f, "`{}`", kind.open_as_str()),
            Expected::CloseDelim(kind) => write!(f, "`{}`", kind.close_as_str()),
            Expected::Symbol(symbol) => write!(f, "`{}`", symbol),
            Expected::Eof => write!(f, "end of file"),
        }
    }
}
