//! Byte ranges into the text being scanned.
//!
//! The block splitter works on whole lines and slices plain runs, code
//! bodies and search lines straight out of its input. A `Span` records
//! where such a piece lives so it can be borrowed instead of copied.

use std::ops::Range;

/// A byte range in the source text, `[start, end)`.
///
/// # Example
///
/// ```rust
/// use mfm_core::span::Span;
///
/// let span = Span::new(2, 5);
/// assert_eq!(span.len(), 3);
/// assert_eq!(span.slice("hello world"), "llo");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Starting byte offset (inclusive).
    pub start: usize,
    /// Ending byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span from byte offsets.
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length of the span in bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if this span covers no bytes.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Extend this span so it also covers `other`.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Borrow the covered text out of `source`.
    ///
    /// The span must lie on character boundaries of `source`; spans handed
    /// out by the lexer always do, since they start and end next to `\n`.
    #[inline]
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.as_range()]
    }

    #[inline]
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}
