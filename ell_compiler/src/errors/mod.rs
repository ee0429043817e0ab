mod builder;
mod source;
mod span;

use std::{fmt, io};
use thiserror::Error;

pub use self::builder::DiagnosticBuilder;
pub(crate) use self::builder::Label;
pub use self::source::SourceBuffer;
pub use self::span::Span;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Level {
    ICE,
    Error,
    Warning,
    Help,
    Note,
}

/// What went wrong. The variants double as labels a renderer may show.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    Lex,
    Parse,
    UnknownName,
    DuplicateName,
    NotAssignable,
    WrongArity,
    KindMismatch,
    PrivateAccess,
    MissingMethod,
    ForbiddenImpl,
    LabelNotInLoop,
    EnumWithExtras,
    ReservedTypeDeclared,
    ImportCycle,
    PathNotFound,
    Internal,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Lex => "lex-error",
            ErrorKind::Parse => "parse-error",
            ErrorKind::UnknownName => "unknown-name",
            ErrorKind::DuplicateName => "duplicate-name",
            ErrorKind::NotAssignable => "not-assignable",
            ErrorKind::WrongArity => "wrong-arity",
            ErrorKind::KindMismatch => "kind-mismatch",
            ErrorKind::PrivateAccess => "private-access",
            ErrorKind::MissingMethod => "missing-method",
            ErrorKind::ForbiddenImpl => "forbidden-impl",
            ErrorKind::LabelNotInLoop => "label-not-in-loop",
            ErrorKind::EnumWithExtras => "enum-with-extras",
            ErrorKind::ReservedTypeDeclared => "reserved-type-declared",
            ErrorKind::ImportCycle => "import-cycle",
            ErrorKind::PathNotFound => "path-not-found",
            ErrorKind::Internal => "internal-error",
        }
    }

    /// Returns `true` for the errors a resolver reports (as opposed to
    /// lexing, parsing or loading imports).
    pub const fn is_resolve_error(&self) -> bool {
        !matches!(
            self,
            ErrorKind::Lex
                | ErrorKind::Parse
                | ErrorKind::ImportCycle
                | ErrorKind::PathNotFound
                | ErrorKind::Internal
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single fatal error of the front-end. The first one raised ends
/// the compilation.
#[derive(Clone, Debug, Error)]
#[error("{message} ({line}:{column})")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub level: Level,
    pub message: String,
    pub span: Span,
    pub line: usize,
    pub column: usize,
    pub origin: Option<String>,
    labels: Vec<Label>,
    footers: Vec<Label>,
}

impl CompileError {
    /// `note:`/`help:` lines attached to this error.
    pub fn notes(&self) -> impl Iterator<Item = &str> {
        self.footers.iter().filter_map(|x| x.contents.as_deref())
    }

    /// Plain-text frame around the error, see [`SourceBuffer::code_frame`].
    pub fn code_frame(&self, source: &SourceBuffer) -> String {
        source.code_frame(self.span.start, &self.message)
    }

    /// Writes a full report of this error into `sink`.
    pub fn emit(
        &self,
        source: &SourceBuffer,
        sink: &mut impl io::Write,
        color: bool,
    ) -> io::Result<()> {
        builder::render(self, source, sink, color)
    }
}

/// Builds diagnostics for one source buffer.
pub struct DiagnosticsContext<'src> {
    source: &'src SourceBuffer,
}

#[allow(dead_code)]
impl<'src> DiagnosticsContext<'src> {
    pub fn new(source: &'src SourceBuffer) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &'src SourceBuffer {
        self.source
    }

    pub fn build_ice(&self, message: impl ToString) -> DiagnosticBuilder<'_, 'src> {
        DiagnosticBuilder::new(ErrorKind::Internal, message.to_string(), Level::ICE, self)
            .note("this is an internal compiler error")
    }

    pub fn build_ice_span(&self, span: Span, message: impl ToString) -> DiagnosticBuilder<'_, 'src> {
        self.build_ice(message).with_span(span)
    }

    pub fn build_error(&self, kind: ErrorKind, message: impl ToString) -> DiagnosticBuilder<'_, 'src> {
        DiagnosticBuilder::new(kind, message.to_string(), Level::Error, self)
    }

    pub fn build_error_span(
        &self,
        kind: ErrorKind,
        span: Span,
        message: impl ToString,
    ) -> DiagnosticBuilder<'_, 'src> {
        self.build_error(kind, message).with_span(span)
    }

    /// Shorthand for an error without labels or footers.
    pub fn error(&self, kind: ErrorKind, span: Span, message: impl ToString) -> CompileError {
        self.build_error_span(kind, span, message).build()
    }
}
