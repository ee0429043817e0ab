use std::{
    cmp::{max, min},
    fmt,
    ops::Range,
};

/// A `[start, end)` range of code point offsets into a source buffer.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create an empty span that highlights nothing.
    pub const fn empty() -> Self {
        Self { start: 0, end: 0 }
    }

    /// A zero-width span sitting at `offset`.
    pub const fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Adjust this span so that it contains `other`.
    /// For instance, if we have two spans:
    /// ```text
    /// fn main() { print("Hello world") }
    /// ^^          ^^^^^
    /// span_a      span_b
    /// ```
    ///
    /// ...then `span_a.grow_to_contain(&span_b)` would make `span_a` look like
    /// this:
    /// ```text
    /// fn main() { print("Hello world") }
    /// ^^^^^^^^^^^^^^^^^
    /// span_a
    /// ```
    ///
    /// `span_b.grow_to_contain(&span_a)` would produce the same result.
    pub fn grow_to_contain(&mut self, other: &Span) {
        if other.is_empty() {
            // x + 0 = x,
            // so we don't need to do anything
        } else if self.is_empty() {
            // 0 + x = x,
            // so we must take on the value of other
            *self = *other;
        } else {
            self.start = min(self.start, other.start);
            self.end = max(self.end, other.end);
        }
    }

    /// Returns a span covering both `self` and `other`.
    pub fn to(mut self, other: Span) -> Span {
        self.grow_to_contain(&other);
        self
    }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
