//! Line scanner for the block splitter.
//!
//! Block rules are anchored to whole lines, so the splitter walks its input
//! one line at a time. Lines borrow from the input and newline search is
//! done with `memchr`.
//!
//! Every `\n` separates two lines: `"a\n"` is the lines `"a"` and `""`, and
//! the empty input is one empty line. Keeping the trailing empty line is
//! what lets a plain run end in a newline. No other character is special;
//! in particular a `\r` before `\n` stays part of its line.

use crate::span::Span;
use memchr::memchr;

/// A single line from the input with its source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// The line text (without the separating newline).
    pub text: &'a str,
    /// Byte span in the original input.
    pub span: Span,
}

impl<'a> Line<'a> {
    /// Check if the line starts with the given prefix.
    #[inline(always)]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.text.as_bytes().starts_with(prefix.as_bytes())
    }

    /// Strip a prefix from the line, returning the remainder.
    #[inline(always)]
    pub fn strip_prefix(&self, prefix: &str) -> Option<&'a str> {
        self.text.strip_prefix(prefix)
    }
}

/// Line-based lexer for the block splitter.
///
/// Lookahead across several lines is done by cloning the lexer, scanning
/// ahead on the clone and writing it back only when a block rule matched.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    /// The complete input text.
    input: &'a str,
    /// Input as bytes for scanning.
    bytes: &'a [u8],
    /// Byte offset of the next unread line.
    offset: usize,
    /// Set once the final line (the one without a trailing newline) is read.
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            offset: 0,
            finished: false,
        }
    }

    /// The text being scanned.
    #[inline(always)]
    pub fn input(&self) -> &'a str {
        self.input
    }

    /// Byte offset of the next unread line.
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Check if all lines have been consumed.
    #[inline(always)]
    pub fn is_eof(&self) -> bool {
        self.finished
    }

    /// Look at the next line without consuming it.
    #[inline]
    pub fn peek_line(&self) -> Option<Line<'a>> {
        self.clone().next_line()
    }

    /// Consume and return the next line.
    #[inline]
    pub fn next_line(&mut self) -> Option<Line<'a>> {
        if self.finished {
            return None;
        }

        let start = self.offset;
        let end = match memchr(b'\n', &self.bytes[start..]) {
            Some(pos) => {
                self.offset = start + pos + 1;
                start + pos
            }
            None => {
                self.offset = self.bytes.len();
                self.finished = true;
                self.bytes.len()
            }
        };

        let span = Span::new(start, end);
        Some(Line {
            text: span.slice(self.input),
            span,
        })
    }

    /// Consume lines until the one containing byte offset `end - 1` has been
    /// read, returning the span from the first consumed line to that point.
    ///
    /// Used by the rules whose closing marker is found by searching the
    /// remaining input rather than line by line.
    pub fn consume_through(&mut self, end: usize) -> Option<Span> {
        let first = self.next_line()?;
        let mut covered = first.span;
        while covered.end < end {
            match self.next_line() {
                Some(line) => covered = covered.merge(line.span),
                None => break,
            }
        }
        Some(covered)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Line<'a>> {
        self.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(input: &str) -> Vec<&str> {
        Lexer::new(input).map(|line| line.text).collect()
    }

    #[test]
    fn empty_input_is_one_empty_line() {
        assert_eq!(texts(""), vec![""]);
    }

    #[test]
    fn trailing_newline_yields_final_empty_line() {
        assert_eq!(texts("a\nb\n"), vec!["a", "b", ""]);
        assert_eq!(texts("\n> abc\n"), vec!["", "> abc", ""]);
    }

    #[test]
    fn carriage_return_is_kept() {
        assert_eq!(texts("a\r\nb"), vec!["a\r", "b"]);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lexer = Lexer::new("one\ntwo");
        assert_eq!(lexer.peek_line().map(|l| l.text), Some("one"));
        assert_eq!(lexer.next_line().map(|l| l.text), Some("one"));
        assert_eq!(lexer.offset(), 4);
        assert_eq!(lexer.next_line().map(|l| l.text), Some("two"));
        assert!(lexer.is_eof());
        assert_eq!(lexer.next_line(), None);
    }

    #[test]
    fn consume_through_covers_every_line_up_to_offset() {
        let input = "\\[a\nb\\]\nrest";
        let mut lexer = Lexer::new(input);
        let span = lexer.consume_through(7).unwrap();
        assert_eq!(span.slice(input), "\\[a\nb\\]");
        assert_eq!(lexer.next_line().map(|l| l.text), Some("rest"));
    }
}
