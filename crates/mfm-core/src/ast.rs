//! Node types produced by the parser.
//!
//! A parse result is a forest: an ordered `Vec<Node>` with no wrapper root.
//! Every node is one of a closed set of types (see [`NodeType`]); its
//! type-specific properties live in [`Props`] and container types also own
//! an ordered list of child nodes.
//!
//! The tree is designed to be:
//!
//! - **Zero-copy where possible**: strings are `Cow<'a, str>` borrowing from
//!   the input; text that had to be rebuilt (quote bodies) is owned.
//! - **Closed**: `Props` is an enum, so the serializer and walker match on
//!   every node type exhaustively.
//! - **Shape-stable**: children are private. After construction the only
//!   way to change a tree is to edit `Props` in place.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

/// Borrowed or owned string type for zero-copy parsing.
pub type CowStr<'a> = Cow<'a, str>;

/// Type tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    /// Plain text run.
    Text,
    /// `> ` quoted block.
    Quote,
    /// Search line (`query Search`).
    Search,
    /// Fenced code block.
    CodeBlock,
    /// `\[ ... \]` display math.
    MathBlock,
    /// `<center>` block.
    Center,
    /// `:name:` custom emoji.
    EmojiCode,
    /// Unicode emoji grapheme cluster.
    UnicodeEmoji,
    /// `**bold**`.
    Bold,
    /// `<small>small</small>`.
    Small,
    /// `<i>italic</i>` or `*italic*`.
    Italic,
    /// `~~strike~~`.
    Strike,
    /// `` `code` ``.
    InlineCode,
    /// `\( ... \)` inline math.
    MathInline,
    /// `#hashtag`.
    Hashtag,
    /// Bare URL.
    Url,
    /// `[label](url)` link.
    Link,
    /// `@user` or `@user@host`.
    Mention,
    /// `[name body]` function.
    Fn,
}

impl NodeType {
    /// Every node type, in declaration order.
    pub const ALL: [NodeType; 19] = [
        NodeType::Text,
        NodeType::Quote,
        NodeType::Search,
        NodeType::CodeBlock,
        NodeType::MathBlock,
        NodeType::Center,
        NodeType::EmojiCode,
        NodeType::UnicodeEmoji,
        NodeType::Bold,
        NodeType::Small,
        NodeType::Italic,
        NodeType::Strike,
        NodeType::InlineCode,
        NodeType::MathInline,
        NodeType::Hashtag,
        NodeType::Url,
        NodeType::Link,
        NodeType::Mention,
        NodeType::Fn,
    ];

    /// The tag name used by downstream consumers (`"codeBlock"`, ...).
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeType::Text => "text",
            NodeType::Quote => "quote",
            NodeType::Search => "search",
            NodeType::CodeBlock => "codeBlock",
            NodeType::MathBlock => "mathBlock",
            NodeType::Center => "center",
            NodeType::EmojiCode => "emojiCode",
            NodeType::UnicodeEmoji => "unicodeEmoji",
            NodeType::Bold => "bold",
            NodeType::Small => "small",
            NodeType::Italic => "italic",
            NodeType::Strike => "strike",
            NodeType::InlineCode => "inlineCode",
            NodeType::MathInline => "mathInline",
            NodeType::Hashtag => "hashtag",
            NodeType::Url => "url",
            NodeType::Link => "link",
            NodeType::Mention => "mention",
            NodeType::Fn => "fn",
        }
    }

    /// Whether nodes of this type are produced by the block splitter.
    pub const fn is_block(self) -> bool {
        matches!(
            self,
            NodeType::Quote
                | NodeType::Search
                | NodeType::CodeBlock
                | NodeType::MathBlock
                | NodeType::Center
        )
    }

    /// Whether nodes of this type own children.
    pub const fn is_container(self) -> bool {
        matches!(
            self,
            NodeType::Quote
                | NodeType::Center
                | NodeType::Bold
                | NodeType::Small
                | NodeType::Italic
                | NodeType::Strike
                | NodeType::Link
                | NodeType::Fn
        )
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type tag that does not name any node type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown node type: {0}")]
pub struct UnknownNodeType(pub String);

impl FromStr for NodeType {
    type Err = UnknownNodeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| UnknownNodeType(s.to_string()))
    }
}

/// Value of a function argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue<'a> {
    /// `key=value`.
    Str(CowStr<'a>),
    /// A bare `key`, meaning boolean true.
    Flag,
}

impl<'a> ArgValue<'a> {
    pub fn into_owned(self) -> ArgValue<'static> {
        match self {
            ArgValue::Str(s) => ArgValue::Str(Cow::Owned(s.into_owned())),
            ArgValue::Flag => ArgValue::Flag,
        }
    }
}

/// Arguments of a function node, keyed by name.
///
/// Keeps insertion order so a function serializes back with its arguments
/// in source order. Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FnArgs<'a> {
    entries: Vec<(CowStr<'a>, ArgValue<'a>)>,
}

impl<'a> FnArgs<'a> {
    /// Create an empty argument map.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Set `key` to `value`, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<CowStr<'a>>, value: ArgValue<'a>) -> Option<ArgValue<'a>> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up an argument by name.
    pub fn get(&self, key: &str) -> Option<&ArgValue<'a>> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v)
    }

    /// Iterate over arguments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue<'a>)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_owned(self) -> FnArgs<'static> {
        FnArgs {
            entries: self
                .entries
                .into_iter()
                .map(|(k, v)| (Cow::Owned(k.into_owned()), v.into_owned()))
                .collect(),
        }
    }
}

impl<'a, K: Into<CowStr<'a>>> FromIterator<(K, ArgValue<'a>)> for FnArgs<'a> {
    fn from_iter<I: IntoIterator<Item = (K, ArgValue<'a>)>>(iter: I) -> Self {
        let mut args = FnArgs::new();
        for (key, value) in iter {
            args.insert(key, value);
        }
        args
    }
}

/// Type-specific properties of a node.
///
/// Props never hold parsed sub-content; that lives in the node's children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Props<'a> {
    Text {
        text: CowStr<'a>,
    },
    Quote,
    Search {
        /// The query, without the search marker.
        query: CowStr<'a>,
        /// The whole source line.
        content: CowStr<'a>,
    },
    CodeBlock {
        /// Code between the fences, verbatim.
        code: CowStr<'a>,
        /// Language token after the opening fence.
        lang: Option<CowStr<'a>>,
    },
    MathBlock {
        formula: CowStr<'a>,
    },
    Center,
    EmojiCode {
        name: CowStr<'a>,
    },
    UnicodeEmoji {
        /// The exact grapheme cluster from the source.
        emoji: CowStr<'a>,
    },
    Bold,
    Small,
    Italic,
    Strike,
    InlineCode {
        code: CowStr<'a>,
    },
    MathInline {
        formula: CowStr<'a>,
    },
    Hashtag {
        /// Label without the leading `#`.
        hashtag: CowStr<'a>,
    },
    Url {
        url: CowStr<'a>,
    },
    Link {
        url: CowStr<'a>,
        /// Set by the `?` prefix.
        silent: bool,
    },
    Mention {
        username: CowStr<'a>,
        host: Option<CowStr<'a>>,
        /// The matched source text, including the leading `@`.
        acct: CowStr<'a>,
    },
    Fn {
        name: CowStr<'a>,
        args: FnArgs<'a>,
    },
}

fn owned(s: CowStr<'_>) -> CowStr<'static> {
    Cow::Owned(s.into_owned())
}

impl<'a> Props<'a> {
    /// The type tag these props belong to.
    pub const fn node_type(&self) -> NodeType {
        match self {
            Props::Text { .. } => NodeType::Text,
            Props::Quote => NodeType::Quote,
            Props::Search { .. } => NodeType::Search,
            Props::CodeBlock { .. } => NodeType::CodeBlock,
            Props::MathBlock { .. } => NodeType::MathBlock,
            Props::Center => NodeType::Center,
            Props::EmojiCode { .. } => NodeType::EmojiCode,
            Props::UnicodeEmoji { .. } => NodeType::UnicodeEmoji,
            Props::Bold => NodeType::Bold,
            Props::Small => NodeType::Small,
            Props::Italic => NodeType::Italic,
            Props::Strike => NodeType::Strike,
            Props::InlineCode { .. } => NodeType::InlineCode,
            Props::MathInline { .. } => NodeType::MathInline,
            Props::Hashtag { .. } => NodeType::Hashtag,
            Props::Url { .. } => NodeType::Url,
            Props::Link { .. } => NodeType::Link,
            Props::Mention { .. } => NodeType::Mention,
            Props::Fn { .. } => NodeType::Fn,
        }
    }

    pub fn into_owned(self) -> Props<'static> {
        match self {
            Props::Text { text } => Props::Text { text: owned(text) },
            Props::Quote => Props::Quote,
            Props::Search { query, content } => Props::Search {
                query: owned(query),
                content: owned(content),
            },
            Props::CodeBlock { code, lang } => Props::CodeBlock {
                code: owned(code),
                lang: lang.map(owned),
            },
            Props::MathBlock { formula } => Props::MathBlock {
                formula: owned(formula),
            },
            Props::Center => Props::Center,
            Props::EmojiCode { name } => Props::EmojiCode { name: owned(name) },
            Props::UnicodeEmoji { emoji } => Props::UnicodeEmoji {
                emoji: owned(emoji),
            },
            Props::Bold => Props::Bold,
            Props::Small => Props::Small,
            Props::Italic => Props::Italic,
            Props::Strike => Props::Strike,
            Props::InlineCode { code } => Props::InlineCode { code: owned(code) },
            Props::MathInline { formula } => Props::MathInline {
                formula: owned(formula),
            },
            Props::Hashtag { hashtag } => Props::Hashtag {
                hashtag: owned(hashtag),
            },
            Props::Url { url } => Props::Url { url: owned(url) },
            Props::Link { url, silent } => Props::Link {
                url: owned(url),
                silent,
            },
            Props::Mention {
                username,
                host,
                acct,
            } => Props::Mention {
                username: owned(username),
                host: host.map(owned),
                acct: owned(acct),
            },
            Props::Fn { name, args } => Props::Fn {
                name: owned(name),
                args: args.into_owned(),
            },
        }
    }
}

/// A node of the parsed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<'a> {
    props: Props<'a>,
    children: Vec<Node<'a>>,
}

impl<'a> Node<'a> {
    /// Build a node from its props and children.
    ///
    /// Leaf types must be given no children.
    pub fn new(props: Props<'a>, children: Vec<Node<'a>>) -> Self {
        debug_assert!(
            props.node_type().is_container() || children.is_empty(),
            "{} nodes cannot have children",
            props.node_type()
        );
        Self { props, children }
    }

    fn leaf(props: Props<'a>) -> Self {
        Self::new(props, Vec::new())
    }

    pub fn node_type(&self) -> NodeType {
        self.props.node_type()
    }

    pub fn props(&self) -> &Props<'a> {
        &self.props
    }

    /// Edit the props in place. The node type is fixed: if `f` replaces the
    /// props with another variant, the original props are restored and
    /// `false` is returned.
    pub fn update_props<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut Props<'a>),
    {
        let original = self.props.clone();
        f(&mut self.props);
        if self.props.node_type() == original.node_type() {
            return true;
        }
        debug!(
            from = original.node_type().as_str(),
            to = self.props.node_type().as_str(),
            "props edit changed the node type, reverted"
        );
        self.props = original;
        false
    }

    pub fn children(&self) -> &[Node<'a>] {
        &self.children
    }

    /// Children for an in-place walk. They can be edited but not added or
    /// removed.
    pub(crate) fn children_mut(&mut self) -> &mut [Node<'a>] {
        &mut self.children
    }

    /// Whether this node came from a block rule.
    pub fn is_block(&self) -> bool {
        self.node_type().is_block()
    }

    /// Detach the tree from the input it borrows from.
    pub fn into_owned(self) -> Node<'static> {
        Node {
            props: self.props.into_owned(),
            children: self.children.into_iter().map(Node::into_owned).collect(),
        }
    }

    // Leaf constructors.

    pub fn text(text: impl Into<CowStr<'a>>) -> Self {
        Self::leaf(Props::Text { text: text.into() })
    }

    pub fn search(query: impl Into<CowStr<'a>>, content: impl Into<CowStr<'a>>) -> Self {
        Self::leaf(Props::Search {
            query: query.into(),
            content: content.into(),
        })
    }

    pub fn code_block(code: impl Into<CowStr<'a>>, lang: Option<CowStr<'a>>) -> Self {
        Self::leaf(Props::CodeBlock {
            code: code.into(),
            lang,
        })
    }

    pub fn math_block(formula: impl Into<CowStr<'a>>) -> Self {
        Self::leaf(Props::MathBlock {
            formula: formula.into(),
        })
    }

    pub fn emoji_code(name: impl Into<CowStr<'a>>) -> Self {
        Self::leaf(Props::EmojiCode { name: name.into() })
    }

    pub fn unicode_emoji(emoji: impl Into<CowStr<'a>>) -> Self {
        Self::leaf(Props::UnicodeEmoji {
            emoji: emoji.into(),
        })
    }

    pub fn inline_code(code: impl Into<CowStr<'a>>) -> Self {
        Self::leaf(Props::InlineCode { code: code.into() })
    }

    pub fn math_inline(formula: impl Into<CowStr<'a>>) -> Self {
        Self::leaf(Props::MathInline {
            formula: formula.into(),
        })
    }

    pub fn hashtag(hashtag: impl Into<CowStr<'a>>) -> Self {
        Self::leaf(Props::Hashtag {
            hashtag: hashtag.into(),
        })
    }

    pub fn url(url: impl Into<CowStr<'a>>) -> Self {
        Self::leaf(Props::Url { url: url.into() })
    }

    pub fn mention(
        username: impl Into<CowStr<'a>>,
        host: Option<CowStr<'a>>,
        acct: impl Into<CowStr<'a>>,
    ) -> Self {
        Self::leaf(Props::Mention {
            username: username.into(),
            host,
            acct: acct.into(),
        })
    }

    // Container constructors.

    pub fn quote(children: Vec<Node<'a>>) -> Self {
        Self::new(Props::Quote, children)
    }

    pub fn center(children: Vec<Node<'a>>) -> Self {
        Self::new(Props::Center, children)
    }

    pub fn bold(children: Vec<Node<'a>>) -> Self {
        Self::new(Props::Bold, children)
    }

    pub fn small(children: Vec<Node<'a>>) -> Self {
        Self::new(Props::Small, children)
    }

    pub fn italic(children: Vec<Node<'a>>) -> Self {
        Self::new(Props::Italic, children)
    }

    pub fn strike(children: Vec<Node<'a>>) -> Self {
        Self::new(Props::Strike, children)
    }

    pub fn link(silent: bool, url: impl Into<CowStr<'a>>, children: Vec<Node<'a>>) -> Self {
        Self::new(
            Props::Link {
                url: url.into(),
                silent,
            },
            children,
        )
    }

    pub fn function(name: impl Into<CowStr<'a>>, args: FnArgs<'a>, children: Vec<Node<'a>>) -> Self {
        Self::new(
            Props::Fn {
                name: name.into(),
                args,
            },
            children,
        )
    }
}
