//! Robustness tests: totality on arbitrary input, structural invariants,
//! idempotent serialization and resource limits

use mfm_core::{
    parse, parse_plain, to_string, walk, Node, NodeType, ParseError, Parser, Profile, RuleSet,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.next_u32() as usize % items.len()]
    }
}

const SEED: u64 = 0x5eed;
const CASES: usize = 500;
const MAX_FRAGMENTS: u32 = 40;

/// Pieces of markup, half-open constructs and ordinary text.
const FRAGMENTS: &[&str] = &[
    "abc", " ", "\n", "> ", ">", "```", "```js", "\\[", "\\]", "\\(", "\\)", "<center>",
    "</center>", "<small>", "</small>", "<i>", "</i>", "***", "**", "*", "~~", "`", "[", "]",
    "(", ")", "?[", "](https://x.test)", "[tada ", "[spin.speed=2s ", "@ai", "@ai@host.test",
    "#tag", "#123", "https://misskey.io/@ai", ".", ",", ":emoji:", ":", "😇", "#️⃣", "🇯🇵",
    "👨\u{200D}👩\u{200D}👧", "❤️", "今起きた", " search", " 検索", "\r", "\t",
];

fn random_input(rng: &mut Lcg) -> String {
    random_from(rng, FRAGMENTS)
}

fn random_from(rng: &mut Lcg, fragments: &[&str]) -> String {
    let len = rng.next_u32() % MAX_FRAGMENTS;
    (0..len).map(|_| rng.pick(fragments)).collect()
}

/// Every fragment without an asterisk. `*x*` and `***x***` are written back
/// as `<i>x</i>` and `[tada x]`, which can bind differently to their
/// neighbours, so only these inputs are expected to be idempotent.
fn canonical_fragments() -> Vec<&'static str> {
    FRAGMENTS
        .iter()
        .copied()
        .filter(|fragment| !fragment.contains('*'))
        .collect()
}

fn assert_well_formed(nodes: &[Node<'_>], input: &str) {
    for node in walk(nodes) {
        if !node.node_type().is_container() {
            assert!(node.children().is_empty(), "leaf with children in {input:?}");
        }
        if let mfm_core::Props::Text { text } = node.props() {
            assert!(!text.is_empty(), "empty text node in {input:?}");
        }
    }
    assert_no_adjacent_text(nodes, input);
}

fn assert_no_adjacent_text(nodes: &[Node<'_>], input: &str) {
    for pair in nodes.windows(2) {
        assert!(
            !(pair[0].node_type() == NodeType::Text && pair[1].node_type() == NodeType::Text),
            "adjacent text nodes in {input:?}"
        );
    }
    for node in nodes {
        assert_no_adjacent_text(node.children(), input);
    }
}

// ============================================================================
// Totality
// ============================================================================

#[test]
fn test_random_inputs_always_parse() {
    let mut rng = Lcg::new(SEED);
    for _ in 0..CASES {
        let input = random_input(&mut rng);
        let nodes = parse(&input).unwrap_or_else(|e| panic!("{e} for {input:?}"));
        assert_well_formed(&nodes, &input);

        let out = to_string(&nodes);
        assert!(parse(&out).is_ok(), "serialized form failed to parse: {out:?}");
    }
}

#[test]
fn test_plain_profile_reproduces_source() {
    let mut rng = Lcg::new(SEED ^ 0xabcd);
    for _ in 0..CASES {
        let input = random_input(&mut rng);
        let nodes = parse_plain(&input).unwrap();
        assert_well_formed(&nodes, &input);
        assert_eq!(to_string(&nodes), input);
    }
}

#[test]
fn test_no_rules_yields_single_text() {
    let parser = Parser::new(Profile::Plain).with_rules(RuleSet::empty());
    let mut rng = Lcg::new(SEED + 1);
    for _ in 0..50 {
        let input = random_input(&mut rng);
        let nodes = parser.parse(&input).unwrap();
        if input.is_empty() {
            assert!(nodes.is_empty());
        } else {
            assert_eq!(nodes, vec![Node::text(input.as_str())]);
        }
    }
}

#[test]
fn test_unclosed_openers_stay_text() {
    let input = "[a ".repeat(50);
    assert_eq!(parse(&input).unwrap(), vec![Node::text(input.as_str())]);

    let input = "<small>a <i>b \\(d ".repeat(20);
    assert_eq!(parse(&input).unwrap(), vec![Node::text(input.as_str())]);
}

#[test]
fn test_unclosed_openers_past_depth_limit_stay_text() {
    let input = "<small>a ".repeat(130);
    assert_eq!(parse(&input).unwrap(), vec![Node::text(input.as_str())]);

    let input = "[a ".repeat(300);
    assert_eq!(parse(&input).unwrap(), vec![Node::text(input.as_str())]);
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_random_inputs_are_idempotent() {
    let fragments = canonical_fragments();
    let mut rng = Lcg::new(SEED ^ 0x1de);
    for _ in 0..CASES {
        let input = random_from(&mut rng, &fragments);
        let first = parse(&input).unwrap();
        let serialized = to_string(&first);
        let second = parse(&serialized).unwrap();
        assert_eq!(second, first, "input {input:?} serialized as {serialized:?}");
    }
}

#[rstest]
#[case("before\n<center>\nHello [tada everynyan! 🎉]\n\nI'm @ai, A bot of misskey!\n\nhttps://github.com/syuilo/ai\n</center>\nafter")]
#[case("***big*** and *it* and >quote")]
#[case("> > nested\n> quote\ntext")]
#[case("<center>**x**</center>\n```\ncode\n```\n\\[f\\]")]
#[case("[official instance](https://misskey.io/@ai). ?[s](https://x.test)")]
#[case("#tag @ai@host.test :e: 😇 `c` \\(m\\) ~~s~~ <small>sm</small>")]
#[case("MFM 書き方 123 [Search]\nafter")]
fn test_serialization_is_idempotent(#[case] input: &str) {
    let first = parse(input).unwrap();
    let serialized = to_string(&first);
    let second = parse(&serialized).unwrap();
    assert_eq!(second, first);
    assert_eq!(to_string(&second), serialized);
}

// ============================================================================
// Resource Limits
// ============================================================================

#[test]
fn test_inline_depth_limit() {
    let nested = |n: usize| format!("{}x{}", "<small>".repeat(n), "</small>".repeat(n));

    let src = nested(100);
    let nodes = parse(&src).unwrap();
    assert_eq!(walk(&nodes).filter(|n| n.node_type() == NodeType::Small).count(), 100);

    assert_eq!(
        parse(&nested(200)).unwrap_err(),
        ParseError::DepthLimitExceeded { limit: 128 }
    );
}

#[test]
fn test_block_depth_limit() {
    let parser = Parser::new(Profile::Full).with_max_depth(2);
    assert!(parser.parse("> > x").is_ok());

    let err = parser.parse("> > > x").unwrap_err();
    assert_eq!(err, ParseError::DepthLimitExceeded { limit: 2 });
    assert!(err.is_resource_limit());
}

#[test]
fn test_deep_quote_hits_default_limit() {
    let input = format!("{} x", ">".repeat(200));
    assert!(matches!(
        parse(&input),
        Err(ParseError::DepthLimitExceeded { .. })
    ));
}

#[test]
fn test_input_length_limit() {
    let parser = Parser::new(Profile::Full).with_max_input_len(3);
    assert!(parser.parse("abc").is_ok());

    let err = parser.parse("abcd").unwrap_err();
    assert_eq!(err, ParseError::InputTooLarge { len: 4, limit: 3 });
    assert_eq!(err.to_string(), "input of 4 bytes exceeds the limit of 3 bytes");
}
