use std::io;

use annotate_snippets::{
    display_list::{DisplayList, FormatOptions},
    snippet::{Annotation, AnnotationType, Slice, Snippet, SourceAnnotation},
};

use super::{span::Span, CompileError, DiagnosticsContext, ErrorKind, Level, SourceBuffer};

impl From<Level> for AnnotationType {
    fn from(level: Level) -> Self {
        match level {
            Level::ICE | Level::Error => AnnotationType::Error,
            Level::Warning => AnnotationType::Warning,
            Level::Help => AnnotationType::Help,
            Level::Note => AnnotationType::Note,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Label {
    pub(crate) contents: Option<String>,
    level: Level,
    span: Span,
}

impl<'label> From<&'label Label> for Annotation<'label> {
    fn from(label: &'label Label) -> Self {
        Annotation {
            label: Some(label.contents.as_deref().unwrap_or("")),
            id: None,
            annotation_type: label.level.into(),
        }
    }
}

#[must_use = "a diagnostic does nothing until it is built into an error"]
pub struct DiagnosticBuilder<'ctx, 'src> {
    kind: ErrorKind,
    title: String,
    level: Level,
    labels: Vec<Label>,
    footers: Vec<Label>,
    context: &'ctx DiagnosticsContext<'src>,
}

#[allow(dead_code)]
impl<'ctx, 'src> DiagnosticBuilder<'ctx, 'src> {
    pub(super) fn new(
        kind: ErrorKind,
        title: String,
        level: Level,
        context: &'ctx DiagnosticsContext<'src>,
    ) -> Self {
        Self {
            kind,
            title,
            level,
            labels: Vec::new(),
            footers: Vec::new(),
            context,
        }
    }

    /// Add a label to a highlighted span with the current error level.
    pub fn span_label(mut self, span: Span, message: impl ToString) -> Self {
        self.labels.push(Label {
            contents: Some(message.to_string()),
            level: self.level,
            span,
        });
        self
    }

    /// Add a label to a highlighted span with the `Level::Note` level.
    pub fn note_label(mut self, span: Span, message: impl ToString) -> Self {
        self.labels.push(Label {
            contents: Some(message.to_string()),
            level: Level::Note,
            span,
        });
        self
    }

    /// Highlight the given span with the current error level and no label.
    pub fn with_span(mut self, span: Span) -> Self {
        self.labels.push(Label {
            contents: None,
            level: self.level,
            span,
        });
        self
    }

    /// Highlight the end of the file.
    pub fn with_eof_span(self) -> Self {
        let end = self.context.source.len();
        self.with_span(Span::point(end))
    }

    /// Adds a `help: ...` footer.
    pub fn help(mut self, message: impl ToString) -> Self {
        self.footers.push(Label {
            contents: Some(message.to_string()),
            level: Level::Help,
            span: Span::empty(),
        });
        self
    }

    /// Adds a `note: ...` footer.
    pub fn note(mut self, message: impl ToString) -> Self {
        self.footers.push(Label {
            contents: Some(message.to_string()),
            level: Level::Note,
            span: Span::empty(),
        });
        self
    }

    /// Finishes the diagnostic. The first label decides where the error
    /// is reported; without labels it points at the end of the file.
    pub fn build(self) -> CompileError {
        let source = self.context.source;
        let span = self
            .labels
            .first()
            .map_or_else(|| Span::point(source.len()), |label| label.span);
        let (line, column) = source.line_col(span.start);

        CompileError {
            kind: self.kind,
            level: self.level,
            message: self.title,
            span,
            line,
            column,
            origin: source.origin().map(str::to_owned),
            labels: self.labels,
            footers: self.footers,
        }
    }
}

/// Clamps a span so that it highlights at least one existing character.
fn visible_range(span: Span, source_len: usize) -> (usize, usize) {
    let start = span.start.min(source_len.saturating_sub(1));
    let end = span.end.max(start + 1).min(source_len);
    (start, end)
}

pub(super) fn render(
    error: &CompileError,
    source: &SourceBuffer,
    sink: &mut impl io::Write,
    color: bool,
) -> io::Result<()> {
    let annotations: Vec<SourceAnnotation<'_>> = if source.is_empty() {
        Vec::new()
    } else {
        error
            .labels
            .iter()
            .map(|label| SourceAnnotation {
                label: label.contents.as_deref().unwrap_or(""),
                range: visible_range(label.span, source.len()),
                annotation_type: label.level.into(),
            })
            .collect()
    };

    let snippet = Snippet {
        title: Some(Annotation {
            label: Some(error.message.as_str()),
            id: Some(error.kind.as_str()),
            annotation_type: error.level.into(),
        }),

        footer: error.footers.iter().map(Annotation::from).collect(),

        slices: vec![Slice {
            source: source.as_str(),
            line_start: 1,
            origin: source.origin(),
            fold: !annotations.is_empty(),
            annotations,
        }],

        opt: FormatOptions {
            color,
            ..Default::default()
        },
    };

    writeln!(sink, "{}", DisplayList::from(snippet))
}
