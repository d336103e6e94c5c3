//! Block splitter and parser configuration.
//!
//! The splitter walks the input line by line. At the start of each line the
//! block rules are tried in order; a line no rule claims joins the pending
//! plain run, which is handed to the inline parser as one span when the
//! next block starts or the input ends. Quote and center bodies are split
//! again recursively.
//!
//! Newlines that separate a block from its neighbours belong to the block
//! boundary: they are not part of any text node.

use std::borrow::Cow;

use memchr::memmem;
use tracing::{debug, trace};

use crate::ast::Node;
use crate::error::{ParseError, ParseResult};
use crate::inline::{self, InlineRule, RuleSet};
use crate::lexer::Lexer;
use crate::span::Span;

/// Default maximum nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Suffixes that turn a line into a search block. Matched case-insensitively.
const SEARCH_MARKERS: [&str; 4] = ["[search]", "search", "[検索]", "検索"];

/// A block rule, tried at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockRule {
    Quote,
    CodeBlock,
    MathBlock,
    Center,
    Search,
}

impl BlockRule {
    /// Every rule, in the order they are tried.
    pub const PRIORITY: [BlockRule; 5] = [
        BlockRule::Quote,
        BlockRule::CodeBlock,
        BlockRule::MathBlock,
        BlockRule::Center,
        BlockRule::Search,
    ];
}

/// Named parser presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Profile {
    /// Every block and inline rule.
    #[default]
    Full,
    /// No blocks; only emoji, hashtag, mention and URL inline rules.
    /// Meant for display names and other single-line user text.
    Plain,
}

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Run the block splitter. When off the whole input is one inline span.
    pub blocks: bool,
    /// Enabled inline rules.
    pub inline: RuleSet,
    /// Deepest allowed container nesting.
    pub max_depth: usize,
    /// Longest accepted input, in bytes.
    pub max_input_len: Option<usize>,
}

impl ParserConfig {
    pub const fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Full => Self {
                blocks: true,
                inline: RuleSet::all(),
                max_depth: DEFAULT_MAX_DEPTH,
                max_input_len: None,
            },
            Profile::Plain => Self {
                blocks: false,
                inline: RuleSet::plain(),
                max_depth: DEFAULT_MAX_DEPTH,
                max_input_len: None,
            },
        }
    }

    /// Switch off a single inline rule.
    pub fn without_rule(mut self, rule: InlineRule) -> Self {
        self.inline = self.inline.without(rule);
        self
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::for_profile(Profile::Full)
    }
}

impl From<Profile> for ParserConfig {
    fn from(profile: Profile) -> Self {
        Self::for_profile(profile)
    }
}

/// Markup parser.
///
/// A parser holds only its configuration, so one instance can be shared
/// and reused for any number of inputs.
///
/// ```
/// use mfm_core::{NodeType, Parser, Profile};
///
/// let nodes = Parser::new(Profile::Full).parse("> **hi** @ai").unwrap();
/// assert_eq!(nodes[0].node_type(), NodeType::Quote);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with the given profile.
    #[inline]
    pub fn new(profile: Profile) -> Self {
        Self::with_config(profile.into())
    }

    #[inline]
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Override the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Reject inputs longer than `limit` bytes.
    pub fn with_max_input_len(mut self, limit: usize) -> Self {
        self.config.max_input_len = Some(limit);
        self
    }

    /// Replace the enabled inline rules.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.config.inline = rules;
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `input` into a forest.
    ///
    /// Malformed markup never fails; it falls back to text. An error means a
    /// configured limit was exceeded.
    pub fn parse<'a>(&self, input: &'a str) -> ParseResult<Vec<Node<'a>>> {
        if let Some(limit) = self.config.max_input_len {
            if input.len() > limit {
                debug!(len = input.len(), limit, "input rejected");
                return Err(ParseError::InputTooLarge {
                    len: input.len(),
                    limit,
                });
            }
        }

        debug!(
            len = input.len(),
            blocks = self.config.blocks,
            rules = ?self.config.inline,
            "parsing"
        );

        if self.config.blocks {
            self.parse_blocks(input, 0)
        } else {
            self.parse_inline_span(input, 0)
        }
    }

    fn parse_inline_span<'a>(&self, text: &'a str, depth: usize) -> ParseResult<Vec<Node<'a>>> {
        inline::parse_inlines(text, self.config.inline, depth, self.config.max_depth)
    }

    fn check_depth(&self, depth: usize) -> ParseResult<()> {
        if depth > self.config.max_depth {
            debug!(depth, limit = self.config.max_depth, "block nesting limit reached");
            return Err(ParseError::DepthLimitExceeded {
                limit: self.config.max_depth,
            });
        }
        Ok(())
    }

    fn parse_blocks<'a>(&self, input: &'a str, depth: usize) -> ParseResult<Vec<Node<'a>>> {
        self.check_depth(depth)?;

        let mut lexer = Lexer::new(input);
        let mut nodes = Vec::with_capacity(4);
        let mut plain: Option<Span> = None;

        while !lexer.is_eof() {
            if let Some(block) = self.parse_block(&mut lexer, depth)? {
                if let Some(run) = plain.take() {
                    self.flush_plain(run.slice(input), depth, &mut nodes)?;
                }
                nodes.push(block);
                continue;
            }

            let Some(line) = lexer.next_line() else {
                break;
            };
            plain = Some(match plain {
                Some(run) => run.merge(line.span),
                None => line.span,
            });
        }

        if let Some(run) = plain {
            self.flush_plain(run.slice(input), depth, &mut nodes)?;
        }
        Ok(nodes)
    }

    #[inline]
    fn flush_plain<'a>(
        &self,
        text: &'a str,
        depth: usize,
        nodes: &mut Vec<Node<'a>>,
    ) -> ParseResult<()> {
        if !text.is_empty() {
            nodes.extend(self.parse_inline_span(text, depth)?);
        }
        Ok(())
    }

    /// Try every block rule at the current line. The lexer only advances
    /// when one matches.
    fn parse_block<'a>(&self, lexer: &mut Lexer<'a>, depth: usize) -> ParseResult<Option<Node<'a>>> {
        for rule in BlockRule::PRIORITY {
            let mut probe = lexer.clone();
            let matched = match rule {
                BlockRule::Quote => self.parse_quote(&mut probe, depth)?,
                BlockRule::CodeBlock => parse_code_block(&mut probe),
                BlockRule::MathBlock => parse_math_block(&mut probe),
                BlockRule::Center => self.parse_center(&mut probe, depth)?,
                BlockRule::Search => parse_search(&mut probe),
            };
            if let Some(node) = matched {
                trace!(?rule, offset = lexer.offset(), "block matched");
                *lexer = probe;
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Consecutive lines starting with `>`. The marker and one following
    /// space are removed and the rebuilt body is split again.
    fn parse_quote<'a>(&self, lexer: &mut Lexer<'a>, depth: usize) -> ParseResult<Option<Node<'a>>> {
        let mut body = String::new();
        let mut lines = 0usize;

        while let Some(line) = lexer.peek_line() {
            let Some(rest) = line.strip_prefix(">") else {
                break;
            };
            if lines > 0 {
                body.push('\n');
            }
            body.push_str(rest.strip_prefix(' ').unwrap_or(rest));
            lines += 1;
            lexer.next_line();
        }

        if lines == 0 {
            return Ok(None);
        }
        let children: Vec<Node<'static>> = self
            .parse_blocks(&body, depth + 1)?
            .into_iter()
            .map(Node::into_owned)
            .collect();
        Ok(Some(Node::quote(children)))
    }

    /// `<center>` … `</center>`, where the closing tag ends a line.
    fn parse_center<'a>(&self, lexer: &mut Lexer<'a>, depth: usize) -> ParseResult<Option<Node<'a>>> {
        let Some((body, end)) = enclosed(lexer, "<center>", "</center>") else {
            return Ok(None);
        };
        let body = body.strip_prefix('\n').unwrap_or(body);
        let body = body.strip_suffix('\n').unwrap_or(body);
        if body.is_empty() {
            return Ok(None);
        }

        let children = self.parse_blocks(body, depth + 1)?;
        lexer.consume_through(end);
        Ok(Some(Node::center(children)))
    }
}

/// Find `open` at the start of the current line and the first `close` after
/// it that ends a line. Returns the text in between and the position after
/// `close`, without consuming anything.
fn enclosed<'a>(lexer: &Lexer<'a>, open: &str, close: &str) -> Option<(&'a str, usize)> {
    let line = lexer.peek_line()?;
    if !line.starts_with(open) {
        return None;
    }

    let input = lexer.input();
    let body_start = line.span.start + open.len();
    let close_at = body_start + memmem::find(input[body_start..].as_bytes(), close.as_bytes())?;
    let end = close_at + close.len();
    if end < input.len() && input.as_bytes()[end] != b'\n' {
        return None;
    }
    Some((&input[body_start..close_at], end))
}

/// A fence line with an optional language, content lines, and a closing
/// fence line.
fn parse_code_block<'a>(lexer: &mut Lexer<'a>) -> Option<Node<'a>> {
    let open = lexer.next_line()?;
    let info = open.strip_prefix("```")?;
    if info.contains('`') {
        return None;
    }
    let lang = info.split_ascii_whitespace().next();

    let mut content: Option<Span> = None;
    loop {
        let line = lexer.next_line()?;
        if line.text == "```" {
            break;
        }
        content = Some(match content {
            Some(span) => span.merge(line.span),
            None => line.span,
        });
    }

    let code = content?.slice(lexer.input());
    Some(Node::code_block(code, lang.map(Cow::Borrowed)))
}

/// `\[formula\]`, where the closing marker ends a line.
fn parse_math_block<'a>(lexer: &mut Lexer<'a>) -> Option<Node<'a>> {
    let (formula, end) = enclosed(lexer, "\\[", "\\]")?;
    if formula.is_empty() {
        return None;
    }
    lexer.consume_through(end);
    Some(Node::math_block(formula))
}

/// A line ending in whitespace followed by a search marker.
fn parse_search<'a>(lexer: &mut Lexer<'a>) -> Option<Node<'a>> {
    let line = lexer.peek_line()?;
    let query = search_query(line.text)?;
    lexer.next_line();
    Some(Node::search(query, line.text))
}

fn search_query(line: &str) -> Option<&str> {
    SEARCH_MARKERS.iter().find_map(|marker| {
        let split = line.len().checked_sub(marker.len())?;
        if !line.is_char_boundary(split) || !line[split..].eq_ignore_ascii_case(marker) {
            return None;
        }
        let before = &line[..split];
        if !before.ends_with(is_search_space) {
            return None;
        }
        let query = before.trim_end_matches(is_search_space);
        (!query.is_empty()).then_some(query)
    })
}

fn is_search_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{3000}')
}

/// Parse with every rule enabled and default limits.
pub fn parse(input: &str) -> ParseResult<Vec<Node<'_>>> {
    Parser::new(Profile::Full).parse(input)
}

/// Parse with the [`Profile::Plain`] rule set.
pub fn parse_plain(input: &str) -> ParseResult<Vec<Node<'_>>> {
    Parser::new(Profile::Plain).parse(input)
}
