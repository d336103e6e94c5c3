//! Tree to markup serializer.
//!
//! Each node is written in the canonical form of its syntax, so a parsed
//! tree serializes to markup that parses back to the same tree. Sources
//! already in canonical form round-trip byte for byte.
//!
//! Adjacent siblings are separated by a newline when either of them is a
//! block, restoring the line boundary the splitter dropped. Consecutive
//! quotes get an empty line between them.

use std::fmt;

use crate::ast::{ArgValue, Node, NodeType, Props};

/// Serialize a forest back to markup.
pub fn to_string(nodes: &[Node<'_>]) -> String {
    let mut out = String::new();
    write_forest(&mut out, nodes);
    out
}

impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_string(std::slice::from_ref(self)))
    }
}

fn write_forest(out: &mut String, nodes: &[Node<'_>]) {
    let mut prev: Option<NodeType> = None;
    for node in nodes {
        let ty = node.node_type();
        if let Some(prev) = prev {
            if prev.is_block() || ty.is_block() {
                out.push('\n');
            }
            // Two quotes need a blank line or they read back as one.
            if prev == NodeType::Quote && ty == NodeType::Quote {
                out.push('\n');
            }
        }
        write_node(out, node);
        prev = Some(ty);
    }
}

fn write_wrapped(out: &mut String, open: &str, children: &[Node<'_>], close: &str) {
    out.push_str(open);
    write_forest(out, children);
    out.push_str(close);
}

fn write_node(out: &mut String, node: &Node<'_>) {
    let children = node.children();
    match node.props() {
        Props::Text { text } => out.push_str(text),
        Props::Quote => write_quote(out, children),
        Props::Search { content, .. } => out.push_str(content),
        Props::CodeBlock { code, lang } => {
            out.push_str("```");
            if let Some(lang) = lang {
                out.push_str(lang);
            }
            out.push('\n');
            out.push_str(code);
            out.push_str("\n```");
        }
        Props::MathBlock { formula } => {
            out.push_str("\\[");
            out.push_str(formula);
            out.push_str("\\]");
        }
        Props::Center => write_wrapped(out, "<center>\n", children, "\n</center>"),
        Props::EmojiCode { name } => {
            out.push(':');
            out.push_str(name);
            out.push(':');
        }
        Props::UnicodeEmoji { emoji } => out.push_str(emoji),
        Props::Bold => write_wrapped(out, "**", children, "**"),
        Props::Small => write_wrapped(out, "<small>", children, "</small>"),
        Props::Italic => write_wrapped(out, "<i>", children, "</i>"),
        Props::Strike => write_wrapped(out, "~~", children, "~~"),
        Props::InlineCode { code } => {
            out.push('`');
            out.push_str(code);
            out.push('`');
        }
        Props::MathInline { formula } => {
            out.push_str("\\(");
            out.push_str(formula);
            out.push_str("\\)");
        }
        Props::Hashtag { hashtag } => {
            out.push('#');
            out.push_str(hashtag);
        }
        Props::Url { url } => out.push_str(url),
        Props::Link { url, silent } => {
            if *silent {
                out.push('?');
            }
            write_wrapped(out, "[", children, "](");
            out.push_str(url);
            out.push(')');
        }
        Props::Mention { acct, .. } => out.push_str(acct),
        Props::Fn { name, args } => {
            out.push('[');
            out.push_str(name);
            for (i, (key, value)) in args.iter().enumerate() {
                out.push(if i == 0 { '.' } else { ',' });
                out.push_str(key);
                if let ArgValue::Str(value) = value {
                    out.push('=');
                    out.push_str(value);
                }
            }
            out.push(' ');
            write_forest(out, children);
            out.push(']');
        }
    }
}

/// Prefix every line of the serialized body with `> `, or a bare `>` when
/// the line is empty.
fn write_quote(out: &mut String, children: &[Node<'_>]) {
    let body = to_string(children);
    for (i, line) in body.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push('>');
        if !line.is_empty() {
            out.push(' ');
            out.push_str(line);
        }
    }
}
