//! Tests for the tree API: serialization, inspection and extraction

use std::borrow::Cow;

use mfm_core::{
    extract, extract_by, inspect, parse, to_string, walk, ArgValue, FnArgs, Node, NodeType, Props,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

const COMPOSITE: &str = "before\n<center>\nHello [tada everynyan! 🎉]\n\nI'm @ai, A bot of misskey!\n\nhttps://github.com/syuilo/ai\n</center>\nafter";

// ============================================================================
// toString Tests
// ============================================================================

#[test]
fn test_to_string_composite_round_trip() {
    let nodes = parse(COMPOSITE).unwrap();
    assert_eq!(to_string(&nodes), COMPOSITE);
}

#[rstest]
#[case("abc")]
#[case("> abc\n> 123")]
#[case("> <center>\n> a\n> </center>")]
#[case("abc\nhoge piyo bebeyo 検索\n123")]
#[case("```js\nconst a = 1;\n```")]
#[case("123\n\\[math1\\]\nabc\n\\[math2\\]")]
#[case("**123~~abc~~123**")]
#[case("<small>abc\n**123**\nabc</small>")]
#[case("<i>abc</i> `code` \\(x\\)")]
#[case("?[official instance](https://misskey.io/@ai).")]
#[case("@ai@misskey.io #tag :emoji: 😇")]
#[case("[spin.speed=2s,left abc]")]
#[case("a\n\n> q\n>\n> r\n\nb")]
fn test_to_string_canonical_round_trip(#[case] input: &str) {
    assert_eq!(to_string(&parse(input).unwrap()), input);
}

#[rstest]
#[case("***abc***", "[tada abc]")]
#[case("*abc*", "<i>abc</i>")]
#[case(">abc", "> abc")]
#[case("<center>abc</center>", "<center>\nabc\n</center>")]
fn test_to_string_canonicalizes(#[case] input: &str, #[case] expected: &str) {
    let nodes = parse(input).unwrap();
    let out = to_string(&nodes);
    assert_eq!(out, expected);
    assert_eq!(parse(&out).unwrap(), nodes);
}

#[test]
fn test_display_matches_to_string() {
    let nodes = parse("**bold** and @ai").unwrap();
    let joined: String = nodes.iter().map(ToString::to_string).collect();
    assert_eq!(joined, to_string(&nodes));
}

#[test]
fn test_block_siblings_are_newline_separated() {
    let nodes = vec![
        Node::text("a"),
        Node::quote(vec![Node::text("q")]),
        Node::math_block("x"),
        Node::text("b"),
    ];
    assert_eq!(to_string(&nodes), "a\n> q\n\\[x\\]\nb");
}

#[test]
fn test_adjacent_quotes_stay_separate() {
    let nodes = parse("> a\n\n> b").unwrap();
    assert_eq!(
        nodes,
        vec![
            Node::quote(vec![Node::text("a")]),
            Node::quote(vec![Node::text("b")]),
        ]
    );
    assert_eq!(to_string(&nodes), "> a\n\n> b");
    assert_eq!(parse(&to_string(&nodes)).unwrap(), nodes);
}

#[test]
fn test_to_string_of_built_tree() {
    let args: FnArgs = [("x", ArgValue::Flag)].into_iter().collect();
    let nodes = vec![Node::function(
        "flip",
        args,
        vec![Node::link(true, "https://x.test", vec![Node::text("go")])],
    )];
    assert_eq!(to_string(&nodes), "[flip.x ?[go](https://x.test)]");
}

// ============================================================================
// inspect Tests
// ============================================================================

#[test]
fn test_inspect_replaces_text() {
    let mut nodes = parse("good morning [tada everynyan!]").unwrap();
    inspect(&mut nodes, |props| {
        if let Props::Text { text } = props {
            *text = text.replace("good morning", "hello").into();
        }
    });
    assert_eq!(to_string(&nodes), "hello [tada everynyan!]");
}

#[test]
fn test_inspect_visits_every_node_in_preorder() {
    let mut nodes = parse("a **b ~~c~~** d").unwrap();
    let mut seen = Vec::new();
    inspect(&mut nodes, |props| seen.push(props.node_type()));
    assert_eq!(
        seen,
        vec![
            NodeType::Text,
            NodeType::Bold,
            NodeType::Text,
            NodeType::Strike,
            NodeType::Text,
            NodeType::Text,
        ]
    );
}

#[test]
fn test_inspect_reaches_into_quote() {
    let mut nodes = parse("> hi @ai").unwrap();
    inspect(&mut nodes, |props| {
        if let Props::Mention { acct, .. } = props {
            *acct = Cow::Borrowed("@someone");
        }
    });
    assert_eq!(to_string(&nodes), "> hi @someone");
}

#[test]
fn test_inspect_cannot_change_node_type() {
    let mut nodes = parse("**bold** x").unwrap();
    inspect(&mut nodes, |props| {
        if matches!(props, Props::Bold) {
            *props = Props::Text {
                text: Cow::Borrowed("T"),
            };
        }
    });
    assert_eq!(nodes[0].node_type(), NodeType::Bold);
    assert_eq!(nodes[0].children(), &[Node::text("bold")]);
    assert_eq!(to_string(&nodes), "**bold** x");
}

#[test]
fn test_update_props_reports_reverted_edit() {
    let mut node = Node::hashtag("a");
    assert!(node.update_props(|props| {
        if let Props::Hashtag { hashtag } = props {
            *hashtag = Cow::Borrowed("b");
        }
    }));
    assert_eq!(node, Node::hashtag("b"));

    assert!(!node.update_props(|props| *props = Props::Center));
    assert_eq!(node, Node::hashtag("b"));
}

// ============================================================================
// extract / walk Tests
// ============================================================================

#[test]
fn test_extract_emoji_codes_in_document_order() {
    let nodes = parse("abc:hoge:[tada 123:hoge:]:piyo:").unwrap();
    let found: Vec<Node> = extract(&nodes, NodeType::EmojiCode)
        .into_iter()
        .cloned()
        .collect();
    assert_eq!(
        found,
        vec![
            Node::emoji_code("hoge"),
            Node::emoji_code("hoge"),
            Node::emoji_code("piyo"),
        ]
    );
}

#[test]
fn test_extract_nested_in_blocks() {
    let nodes = parse(COMPOSITE).unwrap();
    assert_eq!(extract(&nodes, NodeType::Mention).len(), 1);
    assert_eq!(extract(&nodes, NodeType::Url).len(), 1);
    assert_eq!(extract(&nodes, NodeType::Fn).len(), 1);
    assert!(extract(&nodes, NodeType::Hashtag).is_empty());
}

#[test]
fn test_extract_by_predicate() {
    let nodes = parse("[tada a] [spin b] [tada c]").unwrap();
    let tadas = extract_by(&nodes, |node| {
        matches!(node.props(), Props::Fn { name, .. } if name == "tada")
    });
    assert_eq!(tadas.len(), 2);
}

#[test]
fn test_walk_counts_every_node() {
    let nodes = parse(COMPOSITE).unwrap();
    // text, center, text, fn, text, emoji, text, mention, text, url, text
    assert_eq!(walk(&nodes).count(), 11);
}

#[test]
fn test_walk_empty_forest() {
    assert_eq!(walk(&[]).count(), 0);
}

// ============================================================================
// Node Model Tests
// ============================================================================

#[test]
fn test_node_type_names_round_trip() {
    for ty in NodeType::ALL {
        assert_eq!(ty.as_str().parse::<NodeType>().unwrap(), ty);
    }
    assert_eq!(NodeType::CodeBlock.to_string(), "codeBlock");
    assert!("paragraph".parse::<NodeType>().is_err());
}

#[test]
fn test_block_and_container_types() {
    assert!(NodeType::Quote.is_block());
    assert!(NodeType::Quote.is_container());
    assert!(NodeType::CodeBlock.is_block());
    assert!(!NodeType::CodeBlock.is_container());
    assert!(!NodeType::Link.is_block());
    assert!(NodeType::Link.is_container());
}

#[test]
fn test_fn_args_keep_order_and_replace() {
    let mut args = FnArgs::new();
    assert_eq!(args.insert("b", ArgValue::Flag), None);
    args.insert("a", ArgValue::Str(Cow::Borrowed("1")));
    assert_eq!(
        args.insert("b", ArgValue::Str(Cow::Borrowed("2"))),
        Some(ArgValue::Flag)
    );
    let keys: Vec<&str> = args.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["b", "a"]);
    assert_eq!(args.get("b"), Some(&ArgValue::Str(Cow::Borrowed("2"))));
    assert_eq!(args.len(), 2);
}

#[test]
fn test_into_owned_outlives_input() {
    let owned: Vec<Node<'static>> = {
        let input = String::from("**x** @ai");
        parse(&input)
            .unwrap()
            .into_iter()
            .map(Node::into_owned)
            .collect()
    };
    assert_eq!(to_string(&owned), "**x** @ai");
}
