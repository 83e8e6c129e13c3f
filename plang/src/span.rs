/// Position of a token or node in the source text.
///
/// `line` and `column` are 1-based and point at the first character;
/// `start..end` is the byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(line: usize, column: usize, start: usize, end: usize) -> Self {
        Self { line, column, start, end }
    }

    /// Span starting where `self` starts and ending where `other` ends.
    pub fn to(self, other: Span) -> Span {
        Span {
            line: self.line,
            column: self.column,
            start: self.start,
            end: other.end.max(self.end),
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self {
            line: 1,
            column: 1,
            start: 0,
            end: 0,
        }
    }
}

/// Anything that remembers where it came from.
pub trait Spanned {
    fn span(&self) -> Span;

    fn line(&self) -> usize {
        self.span().line
    }

    fn column(&self) -> usize {
        self.span().column
    }
}
