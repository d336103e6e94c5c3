//! # MFM Core
//!
//! A parser for MFM, the compact markup language used in microblog posts.
//!
//! Input is split into blocks (quotes, fenced code, display math, centered
//! regions, search lines) and the text between them into inline nodes
//! (emphasis, links, mentions, hashtags, emoji, function calls, ...). The
//! result is a forest of [`Node`]s that can be walked, edited in place and
//! serialized back to markup.
//!
//! ## Quick Start
//!
//! ```rust
//! use mfm_core::{extract, parse, to_string, NodeType};
//!
//! let input = "<center>\nHello [tada everynyan! 🎉]\n</center>\nI'm @ai";
//! let nodes = parse(input).unwrap();
//!
//! assert_eq!(extract(&nodes, NodeType::Mention).len(), 1);
//! assert_eq!(to_string(&nodes), input);
//! ```
//!
//! ## Profiles
//!
//! - `Profile::Full` - Every block and inline rule
//! - `Profile::Plain` - Emoji, hashtags, mentions and URLs only, no blocks
//!
//! ## Limits
//!
//! Parsing never fails on malformed markup. It only fails when a limit set
//! on the [`Parser`] is exceeded:
//!
//! ```rust
//! use mfm_core::{ParseError, Parser, Profile};
//!
//! let parser = Parser::new(Profile::Full).with_max_depth(2);
//! let err = parser.parse("**~~<small>deep</small>~~**").unwrap_err();
//! assert_eq!(err, ParseError::DepthLimitExceeded { limit: 2 });
//! ```

pub mod ast;
pub mod emoji;
pub mod error;
pub mod inline;
pub mod lexer;
pub mod parser;
pub mod serialize;
pub mod span;
pub mod walk;

pub use ast::{ArgValue, CowStr, FnArgs, Node, NodeType, Props, UnknownNodeType};
pub use error::{ParseError, ParseResult};
pub use inline::{InlineRule, RuleSet};
pub use parser::{parse, parse_plain, BlockRule, Parser, ParserConfig, Profile, DEFAULT_MAX_DEPTH};
pub use serialize::to_string;
pub use walk::{extract, extract_by, inspect, walk, Walk};
