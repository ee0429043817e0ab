use std::fmt::Write;

use super::Span;

/// Lines shown above the offending line in a code frame.
const FRAME_LINES_BEFORE: usize = 3;
/// Lines shown below the offending line in a code frame.
const FRAME_LINES_AFTER: usize = 2;

/// A source file held as a sequence of Unicode scalar values.
///
/// All offsets handed out by the lexer and stored in spans index into
/// [`SourceBuffer::chars`], not into the UTF-8 bytes.
#[derive(Clone, Debug)]
pub struct SourceBuffer {
    text: String,
    chars: Vec<char>,
    origin: Option<String>,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>, origin: Option<String>) -> Self {
        let text = text.into();
        let chars = text.chars().collect();

        Self {
            text,
            chars,
            origin,
        }
    }

    /// Length in code points.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn get(&self, offset: usize) -> Option<char> {
        self.chars.get(offset).copied()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Returns the text covered by `span`, clamped to the buffer.
    pub fn slice(&self, span: Span) -> String {
        let end = span.end.min(self.len());
        let start = span.start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// Computes the 1-based line and column of `offset`.
    /// `\r\n` counts as a single line break.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let mut line = 1;
        let mut column = 1;

        for (idx, &c) in self.chars.iter().enumerate().take(offset) {
            match c {
                '\n' => {
                    line += 1;
                    column = 1;
                },

                '\r' if self.chars.get(idx + 1) == Some(&'\n') => {},

                '\r' => {
                    line += 1;
                    column = 1;
                },

                _ => column += 1,
            }
        }

        (line, column)
    }

    /// Splits the text at the same line breaks [`SourceBuffer::line_col`]
    /// counts.
    fn lines(&self) -> Vec<&str> {
        let mut res = Vec::new();
        let mut start = 0;
        let mut chars = self.text.char_indices().peekable();

        while let Some((idx, c)) = chars.next() {
            match c {
                '\n' => {
                    res.push(&self.text[start..idx]);
                    start = idx + 1;
                },

                '\r' => {
                    res.push(&self.text[start..idx]);
                    start = idx + 1;

                    if let Some((_, '\n')) = chars.peek() {
                        chars.next();
                        start += 1;
                    }
                },

                _ => {},
            }
        }

        res.push(&self.text[start..]);
        res
    }

    /// Renders a plain-text code frame pointing at `offset`:
    /// three lines of context, the offending line, a caret line carrying
    /// `message` and two trailing lines. Line numbers are right-aligned.
    pub fn code_frame(&self, offset: usize, message: &str) -> String {
        let lines = self.lines();

        let (line, column) = self.line_col(offset);
        let target = (line - 1).min(lines.len() - 1);
        let first = target.saturating_sub(FRAME_LINES_BEFORE);
        let last = (target + FRAME_LINES_AFTER).min(lines.len() - 1);
        let width = (last + 1).to_string().len();

        let mut res = String::new();

        for (idx, text) in lines.iter().enumerate().take(last + 1).skip(first) {
            // Writing into a `String` can't fail
            let _ = writeln!(res, "{:>width$} | {}", idx + 1, text, width = width);

            if idx == target {
                // Keep tabs so the caret lines up with the text above it
                let padding: String = text
                    .chars()
                    .take(column - 1)
                    .map(|c| if c == '\t' { '\t' } else { ' ' })
                    .collect();

                let _ = writeln!(
                    res,
                    "{:>width$} | {}^ {}",
                    "",
                    padding,
                    message,
                    width = width
                );
            }
        }

        res.truncate(res.trim_end().len());
        res
    }
}
