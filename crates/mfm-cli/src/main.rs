//! MFM CLI - Parse, format, check and inspect MFM documents
//!
//! Usage:
//!   mfm [OPTIONS] <COMMAND> <FILE>
//!
//! Commands:
//!   parse     Display the node tree (or JSON with --json)
//!   fmt       Print the canonical serialization
//!   check     Verify that serialization round-trips
//!   extract   Print every node of one type
//!   stats     Show node counts and input size
//!
//! `FILE` may be `-` to read standard input.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser as ClapParser, Subcommand};
use mfm_core::{
    extract, to_string, walk, ArgValue, Node, NodeType, Parser, Profile, Props,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "mfm")]
#[command(about = "MFM markup parser and formatter")]
#[command(version)]
struct Cli {
    /// Use the restricted profile (emoji, hashtags, mentions and URLs only)
    #[arg(long, global = true)]
    plain: bool,

    /// Maximum container nesting depth
    #[arg(long, global = true, value_name = "N")]
    max_depth: Option<usize>,

    /// Log parser activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and display the node tree
    Parse {
        /// Output the tree as JSON
        #[arg(short, long)]
        json: bool,
        #[command(flatten)]
        input: Input,
    },
    /// Print the canonical form of the document
    Fmt {
        #[command(flatten)]
        input: Input,
    },
    /// Check that the document survives a serialize/parse round trip
    Check {
        #[command(flatten)]
        input: Input,
    },
    /// Print every node of the given type, one per line
    Extract {
        /// Node type name, e.g. mention, hashtag, emojiCode
        #[arg(short = 't', long = "type", value_name = "TYPE")]
        node_type: NodeType,
        #[command(flatten)]
        input: Input,
    },
    /// Show document statistics
    Stats {
        #[command(flatten)]
        input: Input,
    },
}

#[derive(Args)]
struct Input {
    /// Input file, or `-` for standard input
    file: PathBuf,
}

impl Input {
    fn read(&self) -> Result<String> {
        let text = if self.file.as_os_str() == "-" {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read standard input")?;
            buf
        } else {
            fs::read_to_string(&self.file)
                .with_context(|| format!("failed to read '{}'", self.file.display()))?
        };
        debug!(file = %self.file.display(), bytes = text.len(), "read input");
        Ok(text)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let profile = if cli.plain { Profile::Plain } else { Profile::Full };
    let mut parser = Parser::new(profile);
    if let Some(max_depth) = cli.max_depth {
        parser = parser.with_max_depth(max_depth);
    }

    match &cli.command {
        Commands::Parse { json, input } => cmd_parse(&parser, &input.read()?, *json),
        Commands::Fmt { input } => cmd_fmt(&parser, &input.read()?),
        Commands::Check { input } => cmd_check(&parser, &input.read()?),
        Commands::Extract { node_type, input } => cmd_extract(&parser, &input.read()?, *node_type),
        Commands::Stats { input } => cmd_stats(&parser, &input.read()?),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn parse<'a>(parser: &Parser, input: &'a str) -> Result<Vec<Node<'a>>> {
    parser.parse(input).context("failed to parse input")
}

// =============================================================================
// Parse Command
// =============================================================================

fn cmd_parse(parser: &Parser, input: &str, json: bool) -> Result<()> {
    let nodes = parse(parser, input)?;

    if json {
        let tree: Vec<JsonNode> = nodes.iter().map(convert_node).collect();
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        print_tree(&nodes, 0);
    }
    Ok(())
}

fn print_tree(nodes: &[Node], indent: usize) {
    let prefix = "  ".repeat(indent);
    for node in nodes {
        println!("{}{}", prefix, describe_node(node));
        print_tree(node.children(), indent + 1);
    }
}

fn describe_node(node: &Node) -> String {
    let ty = node.node_type();
    match node.props() {
        Props::Text { text } => format!("{} {}", ty, quoted(text)),
        Props::Search { query, .. } => format!("{} (query: {})", ty, quoted(query)),
        Props::CodeBlock { code, lang } => {
            let preview: String = code.chars().take(60).collect();
            let ellipsis = if code.chars().count() > 60 { "..." } else { "" };
            format!(
                "{} (lang: {}) {}{}",
                ty,
                lang.as_deref().unwrap_or("none"),
                quoted(&preview),
                ellipsis
            )
        }
        Props::MathBlock { formula } | Props::MathInline { formula } => {
            format!("{} {}", ty, quoted(formula))
        }
        Props::EmojiCode { name } => format!("{} :{}:", ty, name),
        Props::UnicodeEmoji { emoji } => format!("{} {}", ty, emoji),
        Props::InlineCode { code } => format!("{} {}", ty, quoted(code)),
        Props::Hashtag { hashtag } => format!("{} #{}", ty, hashtag),
        Props::Url { url } => format!("{} {}", ty, url),
        Props::Link { url, silent } => format!("{} {} (silent: {})", ty, url, silent),
        Props::Mention { username, host, .. } => format!(
            "{} {} (host: {})",
            ty,
            username,
            host.as_deref().unwrap_or("local")
        ),
        Props::Fn { name, args } => {
            if args.is_empty() {
                format!("{} {}", ty, name)
            } else {
                let args: Vec<String> = args
                    .iter()
                    .map(|(key, value)| match value {
                        ArgValue::Str(value) => format!("{}={}", key, value),
                        ArgValue::Flag => key.to_string(),
                    })
                    .collect();
                format!("{} {} ({})", ty, name, args.join(", "))
            }
        }
        Props::Quote | Props::Center | Props::Bold | Props::Small | Props::Italic | Props::Strike => {
            ty.to_string()
        }
    }
}

fn quoted(s: &str) -> String {
    format!("{:?}", s)
}

// =============================================================================
// Fmt / Check / Extract Commands
// =============================================================================

fn cmd_fmt(parser: &Parser, input: &str) -> Result<()> {
    let nodes = parse(parser, input)?;
    println!("{}", to_string(&nodes));
    Ok(())
}

fn cmd_check(parser: &Parser, input: &str) -> Result<()> {
    let nodes = parse(parser, input)?;
    let canonical = to_string(&nodes);
    let reparsed = parser
        .parse(&canonical)
        .context("canonical form failed to parse")?;

    let round_trips = canonical == input;
    let idempotent = reparsed == nodes;

    println!("Round trip:  {}", if round_trips { "exact" } else { "canonicalized" });
    println!("Idempotent:  {}", if idempotent { "yes" } else { "no" });

    if !idempotent {
        bail!("re-parsing the canonical form produced a different tree");
    }
    Ok(())
}

fn cmd_extract(parser: &Parser, input: &str, node_type: NodeType) -> Result<()> {
    let nodes = parse(parser, input)?;
    for node in extract(&nodes, node_type) {
        println!("{}", node);
    }
    Ok(())
}

// =============================================================================
// Stats Command
// =============================================================================

fn cmd_stats(parser: &Parser, input: &str) -> Result<()> {
    let nodes = parse(parser, input)?;
    let stats = DocumentStats::from_nodes(&nodes, input);

    println!("Document Statistics");
    println!("-------------------");
    println!("Top-level nodes: {}", nodes.len());
    println!("Total nodes:     {}", stats.total);
    println!("Max depth:       {}", stats.max_depth);
    println!();
    println!("Nodes by type:");
    for (ty, count) in &stats.by_type {
        println!("  {:<14}{}", ty.as_str(), count);
    }
    println!();
    println!("Size:");
    println!("  Bytes:      {}", stats.bytes);
    println!("  Characters: {}", stats.chars);
    println!("  Lines:      {}", stats.lines);

    Ok(())
}

struct DocumentStats {
    total: usize,
    max_depth: usize,
    by_type: BTreeMap<NodeType, usize>,
    bytes: usize,
    chars: usize,
    lines: usize,
}

impl DocumentStats {
    fn from_nodes(nodes: &[Node], input: &str) -> Self {
        let mut by_type = BTreeMap::new();
        for node in walk(nodes) {
            *by_type.entry(node.node_type()).or_insert(0) += 1;
        }

        Self {
            total: by_type.values().sum(),
            max_depth: depth(nodes),
            by_type,
            bytes: input.len(),
            chars: input.chars().count(),
            lines: input.lines().count(),
        }
    }
}

fn depth(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .map(|node| 1 + depth(node.children()))
        .max()
        .unwrap_or(0)
}

// =============================================================================
// JSON Output
// =============================================================================

#[derive(Serialize)]
struct JsonNode<'a> {
    #[serde(rename = "type")]
    node_type: &'static str,
    props: JsonProps<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<JsonNode<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum JsonProps<'a> {
    Text {
        text: &'a str,
    },
    Search {
        query: &'a str,
        content: &'a str,
    },
    CodeBlock {
        code: &'a str,
        lang: Option<&'a str>,
    },
    Formula {
        formula: &'a str,
    },
    EmojiCode {
        name: &'a str,
    },
    UnicodeEmoji {
        emoji: &'a str,
    },
    InlineCode {
        code: &'a str,
    },
    Hashtag {
        hashtag: &'a str,
    },
    Url {
        url: &'a str,
    },
    Link {
        url: &'a str,
        silent: bool,
    },
    Mention {
        username: &'a str,
        host: Option<&'a str>,
        acct: &'a str,
    },
    Fn {
        name: &'a str,
        args: serde_json::Map<String, serde_json::Value>,
    },
    Empty {},
}

fn convert_node<'a>(node: &'a Node) -> JsonNode<'a> {
    JsonNode {
        node_type: node.node_type().as_str(),
        props: convert_props(node.props()),
        children: node.children().iter().map(convert_node).collect(),
    }
}

fn convert_props<'a>(props: &'a Props) -> JsonProps<'a> {
    match props {
        Props::Text { text } => JsonProps::Text { text },
        Props::Search { query, content } => JsonProps::Search { query, content },
        Props::CodeBlock { code, lang } => JsonProps::CodeBlock {
            code,
            lang: lang.as_deref(),
        },
        Props::MathBlock { formula } | Props::MathInline { formula } => {
            JsonProps::Formula { formula }
        }
        Props::EmojiCode { name } => JsonProps::EmojiCode { name },
        Props::UnicodeEmoji { emoji } => JsonProps::UnicodeEmoji { emoji },
        Props::InlineCode { code } => JsonProps::InlineCode { code },
        Props::Hashtag { hashtag } => JsonProps::Hashtag { hashtag },
        Props::Url { url } => JsonProps::Url { url },
        Props::Link { url, silent } => JsonProps::Link {
            url,
            silent: *silent,
        },
        Props::Mention {
            username,
            host,
            acct,
        } => JsonProps::Mention {
            username,
            host: host.as_deref(),
            acct,
        },
        Props::Fn { name, args } => JsonProps::Fn {
            name,
            args: args
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        ArgValue::Str(value) => serde_json::Value::String(value.to_string()),
                        ArgValue::Flag => serde_json::Value::Bool(true),
                    };
                    (key.to_string(), value)
                })
                .collect(),
        },
        Props::Quote | Props::Center | Props::Bold | Props::Small | Props::Italic | Props::Strike => {
            JsonProps::Empty {}
        }
    }
}
