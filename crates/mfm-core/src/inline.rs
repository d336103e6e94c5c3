//! Inline parser.
//!
//! Scans a span left to right. At every position the enabled rules are
//! tried in [`InlineRule::PRIORITY`] order and the first match wins;
//! characters no rule claims accumulate into a pending text run that is
//! flushed as one `text` node before the next match.
//!
//! Container bodies (bold, small, function bodies, link labels, ...) are
//! parsed in place: the body scan stops at the first position where the
//! closing delimiter appears, and that check happens before any rule is
//! tried. Nested constructs therefore swallow delimiters that belong to
//! them, so `[tada [a](https://x.test) b]` closes at the last `]`.
//!
//! A container attempt that fails is remembered per position, so
//! unterminated openers cost one scan each instead of one per enclosing
//! attempt.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use memchr::{memchr, memchr2, memmem};
use tracing::debug;

use crate::ast::{ArgValue, FnArgs, Node};
use crate::emoji;
use crate::error::{ParseError, ParseResult};

/// An inline rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineRule {
    /// `***big***`, produced as `fn` named `tada`.
    Big,
    Bold,
    Strike,
    Small,
    /// `<i>…</i>` and `*…*`.
    Italic,
    InlineCode,
    MathInline,
    Fn,
    Link,
    Mention,
    Hashtag,
    Url,
    EmojiCode,
    UnicodeEmoji,
}

impl InlineRule {
    /// Every rule, in the order they are tried at a position.
    pub const PRIORITY: [InlineRule; 14] = [
        InlineRule::Big,
        InlineRule::Bold,
        InlineRule::Strike,
        InlineRule::Small,
        InlineRule::Italic,
        InlineRule::InlineCode,
        InlineRule::MathInline,
        InlineRule::Fn,
        InlineRule::Link,
        InlineRule::Mention,
        InlineRule::Hashtag,
        InlineRule::Url,
        InlineRule::EmojiCode,
        InlineRule::UnicodeEmoji,
    ];

    const fn bit(self) -> u16 {
        1 << self as u16
    }

    /// Rules whose match owns a body that is parsed recursively.
    const fn has_body(self) -> bool {
        matches!(
            self,
            InlineRule::Big
                | InlineRule::Bold
                | InlineRule::Strike
                | InlineRule::Small
                | InlineRule::Italic
                | InlineRule::Fn
                | InlineRule::Link
        )
    }

    /// Cheap first-byte filter.
    fn may_start(self, b: u8) -> bool {
        match self {
            InlineRule::Big | InlineRule::Bold => b == b'*',
            InlineRule::Strike => b == b'~',
            InlineRule::Small => b == b'<',
            InlineRule::Italic => b == b'<' || b == b'*',
            InlineRule::InlineCode => b == b'`',
            InlineRule::MathInline => b == b'\\',
            InlineRule::Fn => b == b'[',
            InlineRule::Link => b == b'[' || b == b'?',
            InlineRule::Mention => b == b'@',
            InlineRule::Hashtag => b == b'#',
            InlineRule::Url => b == b'h',
            InlineRule::EmojiCode => b == b':',
            InlineRule::UnicodeEmoji => !b.is_ascii() || matches!(b, b'0'..=b'9' | b'#' | b'*'),
        }
    }
}

/// A set of enabled inline rules.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleSet(u16);

impl RuleSet {
    /// No rules: everything is text.
    pub const fn empty() -> Self {
        RuleSet(0)
    }

    /// Every rule.
    pub const fn all() -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < InlineRule::PRIORITY.len() {
            bits |= InlineRule::PRIORITY[i].bit();
            i += 1;
        }
        RuleSet(bits)
    }

    /// The reduced set for untrusted single-line text such as display names:
    /// emoji code, unicode emoji, hashtag, mention and bare URL.
    pub const fn plain() -> Self {
        RuleSet::empty()
            .with(InlineRule::EmojiCode)
            .with(InlineRule::UnicodeEmoji)
            .with(InlineRule::Hashtag)
            .with(InlineRule::Mention)
            .with(InlineRule::Url)
    }

    pub const fn with(self, rule: InlineRule) -> Self {
        RuleSet(self.0 | rule.bit())
    }

    pub const fn without(self, rule: InlineRule) -> Self {
        RuleSet(self.0 & !rule.bit())
    }

    pub const fn contains(self, rule: InlineRule) -> bool {
        self.0 & rule.bit() != 0
    }

    /// Enabled rules in priority order.
    pub fn iter(self) -> impl Iterator<Item = InlineRule> {
        InlineRule::PRIORITY
            .into_iter()
            .filter(move |rule| self.contains(*rule))
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSet::all()
    }
}

impl FromIterator<InlineRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = InlineRule>>(iter: I) -> Self {
        iter.into_iter().fold(RuleSet::empty(), RuleSet::with)
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Where a span is being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Context {
    /// Inside a link label: links, URLs and mentions are recognized so
    /// they are consumed whole, but their source is kept as plain text.
    link_label: bool,
}

impl Context {
    const ROOT: Context = Context { link_label: false };
    const LINK_LABEL: Context = Context { link_label: true };

    fn suppresses(self, rule: InlineRule) -> bool {
        self.link_label
            && matches!(
                rule,
                InlineRule::Link | InlineRule::Url | InlineRule::Mention
            )
    }
}

type Matched<'a> = Option<(Node<'a>, usize)>;
type Body<'a> = Option<(Vec<Node<'a>>, usize)>;

/// Parse an inline span into text runs and inline nodes.
///
/// `depth` is the nesting depth the span itself sits at.
pub(crate) fn parse_inlines<'a>(
    text: &'a str,
    rules: RuleSet,
    depth: usize,
    max_depth: usize,
) -> ParseResult<Vec<Node<'a>>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut parser = InlineParser::new(text, rules, max_depth);
    let (nodes, _) = parser
        .parse_nodes(0, None, Context::ROOT, depth)?
        .unwrap_or_default();
    Ok(nodes)
}

struct InlineParser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    rules: RuleSet,
    max_depth: usize,
    /// Container attempts known to fail: (position, rule, in link label).
    failed: HashSet<(usize, InlineRule, bool)>,
}

impl<'a> InlineParser<'a> {
    fn new(text: &'a str, rules: RuleSet, max_depth: usize) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            rules,
            max_depth,
            failed: HashSet::new(),
        }
    }

    /// Scan from `start` until `close` (or end of input when `close` is
    /// `None`), returning the nodes and the position after the delimiter.
    ///
    /// A delimited body must be non-empty and closed; otherwise `None`.
    fn parse_nodes(
        &mut self,
        start: usize,
        close: Option<&'static str>,
        ctx: Context,
        depth: usize,
    ) -> ParseResult<Body<'a>> {
        if depth > self.max_depth {
            // A body whose delimiter never appears again cannot close at
            // any depth, so this is an ordinary failed match.
            if let Some(close) = close {
                if memmem::find(&self.bytes[start..], close.as_bytes()).is_none() {
                    return Ok(None);
                }
            }
            debug!(depth, limit = self.max_depth, "inline nesting limit reached");
            return Err(ParseError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }

        let mut nodes = Vec::new();
        let mut text_start = start;
        let mut pos = start;

        'scan: while pos < self.bytes.len() {
            if let Some(close) = close {
                if self.bytes[pos..].starts_with(close.as_bytes()) {
                    if pos == start {
                        return Ok(None);
                    }
                    self.flush_text(&mut nodes, text_start, pos);
                    return Ok(Some((nodes, pos + close.len())));
                }
            }

            for rule in self.rules.iter() {
                if let Some((node, end)) = self.try_rule(rule, pos, ctx, depth)? {
                    if !ctx.suppresses(rule) {
                        self.flush_text(&mut nodes, text_start, pos);
                        nodes.push(node);
                        text_start = end;
                    }
                    pos = end;
                    continue 'scan;
                }
            }

            pos += self.char_len_at(pos);
        }

        if close.is_some() {
            return Ok(None);
        }
        self.flush_text(&mut nodes, text_start, pos);
        Ok(Some((nodes, pos)))
    }

    #[inline(always)]
    fn flush_text(&self, nodes: &mut Vec<Node<'a>>, start: usize, end: usize) {
        if start < end {
            nodes.push(Node::text(Cow::Borrowed(&self.text[start..end])));
        }
    }

    #[inline(always)]
    fn char_len_at(&self, pos: usize) -> usize {
        self.text[pos..].chars().next().map_or(1, char::len_utf8)
    }

    #[inline(always)]
    fn starts_with_at(&self, pos: usize, s: &str) -> bool {
        self.bytes[pos..].starts_with(s.as_bytes())
    }

    fn try_rule(
        &mut self,
        rule: InlineRule,
        pos: usize,
        ctx: Context,
        depth: usize,
    ) -> ParseResult<Matched<'a>> {
        if !rule.may_start(self.bytes[pos]) {
            return Ok(None);
        }
        let key = (pos, rule, ctx.link_label);
        if rule.has_body() && self.failed.contains(&key) {
            return Ok(None);
        }

        let matched = match rule {
            InlineRule::Big => self
                .delimited(pos, "***", "***", ctx, depth)?
                .map(|(children, end)| (Node::function("tada", FnArgs::new(), children), end)),
            InlineRule::Bold => self
                .delimited(pos, "**", "**", ctx, depth)?
                .map(|(children, end)| (Node::bold(children), end)),
            InlineRule::Strike => self
                .delimited(pos, "~~", "~~", ctx, depth)?
                .map(|(children, end)| (Node::strike(children), end)),
            InlineRule::Small => self
                .delimited(pos, "<small>", "</small>", ctx, depth)?
                .map(|(children, end)| (Node::small(children), end)),
            InlineRule::Italic => self.italic(pos, ctx, depth)?,
            InlineRule::InlineCode => self.inline_code(pos),
            InlineRule::MathInline => self.math_inline(pos),
            InlineRule::Fn => self.function(pos, ctx, depth)?,
            InlineRule::Link => self.link(pos, depth)?,
            InlineRule::Mention => self.mention(pos),
            InlineRule::Hashtag => self.hashtag(pos),
            InlineRule::Url => self.url(pos),
            InlineRule::EmojiCode => self.emoji_code(pos),
            InlineRule::UnicodeEmoji => emoji::emoji_at(&self.text[pos..])
                .map(|cluster| (Node::unicode_emoji(cluster), pos + cluster.len())),
        };

        if matched.is_none() && rule.has_body() {
            self.failed.insert(key);
        }
        Ok(matched)
    }

    fn delimited(
        &mut self,
        pos: usize,
        open: &str,
        close: &'static str,
        ctx: Context,
        depth: usize,
    ) -> ParseResult<Body<'a>> {
        if !self.starts_with_at(pos, open) {
            return Ok(None);
        }
        self.parse_nodes(pos + open.len(), Some(close), ctx, depth + 1)
    }

    fn italic(&mut self, pos: usize, ctx: Context, depth: usize) -> ParseResult<Matched<'a>> {
        if let Some((children, end)) = self.delimited(pos, "<i>", "</i>", ctx, depth)? {
            return Ok(Some((Node::italic(children), end)));
        }

        // `*…*`: single line, no padding inside the markers.
        if self.bytes[pos] != b'*' {
            return Ok(None);
        }
        let body_start = pos + 1;
        match self.bytes.get(body_start) {
            Some(b' ' | b'\t' | b'\n' | b'*') | None => return Ok(None),
            Some(_) => {}
        }
        let Some((children, end)) = self.parse_nodes(body_start, Some("*"), ctx, depth + 1)? else {
            return Ok(None);
        };
        let body = &self.text[body_start..end - 1];
        if body.contains('\n') || body.ends_with([' ', '\t']) {
            return Ok(None);
        }
        Ok(Some((Node::italic(children), end)))
    }

    fn inline_code(&self, pos: usize) -> Matched<'a> {
        let body_start = pos + 1;
        let offset = memchr2(b'`', b'\n', &self.bytes[body_start..])?;
        let close = body_start + offset;
        if offset == 0 || self.bytes[close] != b'`' {
            return None;
        }
        Some((Node::inline_code(&self.text[body_start..close]), close + 1))
    }

    fn math_inline(&self, pos: usize) -> Matched<'a> {
        if !self.starts_with_at(pos, "\\(") {
            return None;
        }
        let body_start = pos + 2;
        let rest = &self.bytes[body_start..];
        let close = body_start + memmem::find(rest, b"\\)")?;
        if close == body_start || memchr(b'\n', &self.bytes[body_start..close]).is_some() {
            return None;
        }
        Some((Node::math_inline(&self.text[body_start..close]), close + 2))
    }

    /// `[name body]` or `[name.key,key=value body]`.
    fn function(&mut self, pos: usize, ctx: Context, depth: usize) -> ParseResult<Matched<'a>> {
        let name_start = pos + 1;
        let name_end = self.scan_while(name_start, is_ident_byte);
        if name_end == name_start {
            return Ok(None);
        }
        let name = &self.text[name_start..name_end];

        let mut args = FnArgs::new();
        let mut cursor = name_end;
        if self.bytes.get(cursor) == Some(&b'.') {
            match self.fn_args(cursor + 1) {
                Some((parsed, next)) => {
                    args = parsed;
                    cursor = next;
                }
                None => return Ok(None),
            }
        }
        if self.bytes.get(cursor) != Some(&b' ') {
            return Ok(None);
        }

        let Some((children, end)) = self.parse_nodes(cursor + 1, Some("]"), ctx, depth + 1)? else {
            return Ok(None);
        };
        // `[label words](url)` is a link even when the label looks like a call.
        if self.link_target(end).is_some() {
            return Ok(None);
        }
        Ok(Some((Node::function(name, args, children), end)))
    }

    /// Comma-separated `key` / `key=value` list ending right before a space.
    fn fn_args(&self, mut pos: usize) -> Option<(FnArgs<'a>, usize)> {
        let mut args = FnArgs::new();
        loop {
            let key_end = self.scan_while(pos, is_ident_byte);
            if key_end == pos {
                return None;
            }
            let key = &self.text[pos..key_end];
            pos = key_end;

            let value = if self.bytes.get(pos) == Some(&b'=') {
                let value_end = self.scan_while(pos + 1, is_arg_value_byte);
                if value_end == pos + 1 {
                    return None;
                }
                let value = &self.text[pos + 1..value_end];
                pos = value_end;
                ArgValue::Str(Cow::Borrowed(value))
            } else {
                ArgValue::Flag
            };
            args.insert(key, value);

            match self.bytes.get(pos) {
                Some(b',') => pos += 1,
                Some(b' ') => return Some((args, pos)),
                _ => return None,
            }
        }
    }

    /// `[label](url)`, optionally prefixed with `?`.
    fn link(&mut self, pos: usize, depth: usize) -> ParseResult<Matched<'a>> {
        let (silent, open) = match self.bytes[pos] {
            b'?' => (true, pos + 1),
            _ => (false, pos),
        };
        if self.bytes.get(open) != Some(&b'[') {
            return Ok(None);
        }

        let Some((label, after_label)) =
            self.parse_nodes(open + 1, Some("]"), Context::LINK_LABEL, depth + 1)?
        else {
            return Ok(None);
        };

        Ok(self
            .link_target(after_label)
            .map(|(url, end)| (Node::link(silent, url, label), end)))
    }

    /// `(http…)` at `pos`, returning the URL and the position after `)`.
    fn link_target(&self, pos: usize) -> Option<(&'a str, usize)> {
        if self.bytes.get(pos) != Some(&b'(') {
            return None;
        }
        let url_start = pos + 1;
        let close = url_start + memchr(b')', &self.bytes[url_start..])?;
        let url = &self.text[url_start..close];
        is_link_target(url).then_some((url, close + 1))
    }

    /// `@user` or `@user@host`.
    fn mention(&self, pos: usize) -> Matched<'a> {
        if pos > 0 && self.bytes[pos - 1].is_ascii_alphanumeric() {
            return None;
        }

        let user_start = pos + 1;
        let mut user_end = self.scan_while(user_start, is_username_byte);
        while user_end > user_start && self.bytes[user_end - 1] == b'-' {
            user_end -= 1;
        }
        if user_end == user_start || self.bytes[user_start] == b'-' {
            return None;
        }
        let username = &self.text[user_start..user_end];

        let mut host = None;
        let mut end = user_end;
        if self.bytes.get(user_end) == Some(&b'@') {
            let host_start = user_end + 1;
            let mut host_end = self.scan_while(host_start, is_host_byte);
            while host_end > host_start && matches!(self.bytes[host_end - 1], b'.' | b'-') {
                host_end -= 1;
            }
            if host_end > host_start {
                host = Some(Cow::Borrowed(&self.text[host_start..host_end]));
                end = host_end;
            }
        }

        Some((Node::mention(username, host, &self.text[pos..end]), end))
    }

    fn hashtag(&self, pos: usize) -> Matched<'a> {
        let label_start = pos + 1;
        let label_len: usize = self.text[label_start..]
            .chars()
            .take_while(|&c| is_hashtag_char(c))
            .map(char::len_utf8)
            .sum();
        let label = &self.text[label_start..label_start + label_len];
        if label.is_empty() || label.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some((Node::hashtag(label), label_start + label_len))
    }

    /// Bare `http(s)://` URL, without trailing sentence punctuation.
    fn url(&self, pos: usize) -> Matched<'a> {
        let scheme_len = ["https://", "http://"]
            .into_iter()
            .find(|scheme| self.starts_with_at(pos, scheme))?
            .len();
        let body_start = pos + scheme_len;

        let mut end = body_start;
        while end < self.bytes.len() {
            let b = self.bytes[end];
            if is_url_byte(b) {
                end += 1;
            } else if b == b'(' {
                match self.url_paren_group(end) {
                    Some(next) => end = next,
                    None => break,
                }
            } else {
                break;
            }
        }
        while end > body_start && matches!(self.bytes[end - 1], b'.' | b',') {
            end -= 1;
        }
        if end == body_start {
            return None;
        }

        Some((Node::url(&self.text[pos..end]), end))
    }

    /// A balanced `(…)` run inside a URL, returning the position after `)`.
    fn url_paren_group(&self, open: usize) -> Option<usize> {
        let mut pos = open + 1;
        while pos < self.bytes.len() {
            match self.bytes[pos] {
                b')' => return Some(pos + 1),
                b'(' => pos = self.url_paren_group(pos)?,
                b if is_url_byte(b) => pos += 1,
                _ => return None,
            }
        }
        None
    }

    fn emoji_code(&self, pos: usize) -> Matched<'a> {
        let name_start = pos + 1;
        let name_end = self.scan_while(name_start, is_emoji_name_byte);
        if name_end == name_start || self.bytes.get(name_end) != Some(&b':') {
            return None;
        }
        Some((Node::emoji_code(&self.text[name_start..name_end]), name_end + 1))
    }

    #[inline]
    fn scan_while(&self, start: usize, pred: impl Fn(u8) -> bool) -> usize {
        self.bytes[start.min(self.bytes.len())..]
            .iter()
            .position(|&b| !pred(b))
            .map_or(self.bytes.len(), |offset| start + offset)
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_arg_value_byte(b: u8) -> bool {
    is_ident_byte(b) || b == b'.' || b == b'-'
}

fn is_username_byte(b: u8) -> bool {
    is_ident_byte(b) || b == b'-'
}

fn is_host_byte(b: u8) -> bool {
    is_ident_byte(b) || b == b'.' || b == b'-'
}

fn is_emoji_name_byte(b: u8) -> bool {
    is_ident_byte(b) || b == b'+' || b == b'-'
}

fn is_url_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b".,_/:%#@$&?!~=+-;'".contains(&b)
}

fn is_hashtag_char(c: char) -> bool {
    !c.is_whitespace()
        && !c.is_control()
        && !matches!(
            c,
            '.' | ','
                | '!'
                | '?'
                | '\''
                | '"'
                | '#'
                | ':'
                | '/'
                | '['
                | ']'
                | '('
                | ')'
                | '<'
                | '>'
                | '「'
                | '」'
                | '【'
                | '】'
                | '（'
                | '）'
                | '\u{FE0F}'
                | '\u{20E3}'
        )
}

fn is_link_target(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(rest) if !rest.is_empty() && !rest.contains(char::is_whitespace))
}
