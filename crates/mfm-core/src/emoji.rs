//! Unicode emoji recognition over extended grapheme clusters.
//!
//! The inline parser asks for the grapheme cluster starting at its scan
//! position and keeps it as one `unicodeEmoji` node when it is an emoji.
//! Segmentation comes from `unicode-segmentation`, so multi-codepoint
//! sequences (ZWJ families, skin tones, flags, keycaps) arrive as a single
//! cluster and only the cluster's shape needs checking here.

use unicode_segmentation::UnicodeSegmentation;

const VARIATION_SELECTOR_16: char = '\u{FE0F}';
const COMBINING_KEYCAP: char = '\u{20E3}';
const REGIONAL_INDICATORS: (char, char) = ('\u{1F1E6}', '\u{1F1FF}');

/// Pictographs that render as emoji without a variation selector.
const PRESENTATION: &[(u32, u32)] = &[
    (0x231A, 0x231B),
    (0x23E9, 0x23EC),
    (0x23F0, 0x23F0),
    (0x23F3, 0x23F3),
    (0x25FD, 0x25FE),
    (0x2614, 0x2615),
    (0x2648, 0x2653),
    (0x267F, 0x267F),
    (0x2693, 0x2693),
    (0x26A1, 0x26A1),
    (0x26AA, 0x26AB),
    (0x26BD, 0x26BE),
    (0x26C4, 0x26C5),
    (0x26CE, 0x26CE),
    (0x26D4, 0x26D4),
    (0x26EA, 0x26EA),
    (0x26F2, 0x26F3),
    (0x26F5, 0x26F5),
    (0x26FA, 0x26FA),
    (0x26FD, 0x26FD),
    (0x2705, 0x2705),
    (0x270A, 0x270B),
    (0x2728, 0x2728),
    (0x274C, 0x274C),
    (0x274E, 0x274E),
    (0x2753, 0x2755),
    (0x2757, 0x2757),
    (0x2795, 0x2797),
    (0x27B0, 0x27B0),
    (0x27BF, 0x27BF),
    (0x2B1B, 0x2B1C),
    (0x2B50, 0x2B50),
    (0x2B55, 0x2B55),
    (0x1F004, 0x1F004),
    (0x1F0CF, 0x1F0CF),
    (0x1F18E, 0x1F18E),
    (0x1F191, 0x1F19A),
    (0x1F201, 0x1F201),
    (0x1F21A, 0x1F21A),
    (0x1F22F, 0x1F22F),
    (0x1F232, 0x1F236),
    (0x1F238, 0x1F23A),
    (0x1F250, 0x1F251),
    (0x1F300, 0x1F64F),
    (0x1F680, 0x1F6FF),
    (0x1F7E0, 0x1F7EB),
    (0x1F90C, 0x1F9FF),
    (0x1FA70, 0x1FAFF),
];

/// Pictographs that are emoji only when followed by U+FE0F.
const TEXT_PRESENTATION: &[(u32, u32)] = &[
    (0x00A9, 0x00A9),
    (0x00AE, 0x00AE),
    (0x203C, 0x203C),
    (0x2049, 0x2049),
    (0x2122, 0x2122),
    (0x2139, 0x2139),
    (0x2194, 0x2199),
    (0x21A9, 0x21AA),
    (0x2328, 0x2328),
    (0x23CF, 0x23CF),
    (0x23ED, 0x23EF),
    (0x23F1, 0x23F2),
    (0x23F8, 0x23FA),
    (0x24C2, 0x24C2),
    (0x25AA, 0x25AB),
    (0x25B6, 0x25B6),
    (0x25C0, 0x25C0),
    (0x25FB, 0x25FC),
    (0x2600, 0x27BF),
    (0x2934, 0x2935),
    (0x2B05, 0x2B07),
    (0x3030, 0x3030),
    (0x303D, 0x303D),
    (0x3297, 0x3297),
    (0x3299, 0x3299),
    (0x1F000, 0x1F2FF),
    (0x1F700, 0x1F8FF),
    (0x1F900, 0x1F90B),
];

fn in_table(table: &[(u32, u32)], c: char) -> bool {
    let cp = c as u32;
    table
        .binary_search_by(|&(lo, hi)| {
            if hi < cp {
                std::cmp::Ordering::Less
            } else if lo > cp {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .is_ok()
}

fn is_regional_indicator(c: char) -> bool {
    (REGIONAL_INDICATORS.0..=REGIONAL_INDICATORS.1).contains(&c)
}

fn is_keycap(cluster: &str) -> bool {
    let mut chars = cluster.chars();
    let Some(base) = chars.next() else {
        return false;
    };
    if !matches!(base, '0'..='9' | '#' | '*') {
        return false;
    }
    let rest: Vec<char> = chars.collect();
    matches!(
        rest.as_slice(),
        [COMBINING_KEYCAP] | [VARIATION_SELECTOR_16, COMBINING_KEYCAP]
    )
}

/// Whether a single grapheme cluster is an emoji.
pub fn is_emoji(cluster: &str) -> bool {
    let mut chars = cluster.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    if is_regional_indicator(first) {
        return chars.next().is_some_and(is_regional_indicator);
    }
    if first.is_ascii() {
        return is_keycap(cluster);
    }
    if in_table(PRESENTATION, first) {
        return true;
    }
    in_table(TEXT_PRESENTATION, first) && cluster.contains(VARIATION_SELECTOR_16)
}

/// The emoji cluster at the start of `text`, if there is one.
pub fn emoji_at(text: &str) -> Option<&str> {
    let cluster = text.graphemes(true).next()?;
    is_emoji(cluster).then_some(cluster)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_sorted_for_binary_search() {
        for table in [PRESENTATION, TEXT_PRESENTATION] {
            for pair in table.windows(2) {
                assert!(pair[0].1 < pair[1].0, "{:X?} overlaps {:X?}", pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn single_codepoint_emoji() {
        assert_eq!(emoji_at("😇 rest"), Some("😇"));
        assert_eq!(emoji_at("🎉"), Some("🎉"));
        assert_eq!(emoji_at("⭐!"), Some("⭐"));
    }

    #[test]
    fn multi_codepoint_sequences_are_one_cluster() {
        let family = "👨\u{200D}👩\u{200D}👧";
        assert_eq!(emoji_at(family), Some(family));
        assert_eq!(emoji_at("👍🏽ok"), Some("👍🏽"));
        assert_eq!(emoji_at("🇯🇵🇺🇸"), Some("🇯🇵"));
    }

    #[test]
    fn keycaps() {
        assert_eq!(emoji_at("#️⃣abc"), Some("#️⃣"));
        assert_eq!(emoji_at("1\u{20E3}"), Some("1\u{20E3}"));
        assert_eq!(emoji_at("#abc"), None);
        assert_eq!(emoji_at("1"), None);
    }

    #[test]
    fn text_presentation_needs_variation_selector() {
        assert_eq!(emoji_at("❤"), None);
        assert_eq!(emoji_at("❤️"), Some("❤️"));
        assert_eq!(emoji_at("©"), None);
        assert_eq!(emoji_at("©\u{FE0F}"), Some("©\u{FE0F}"));
    }

    #[test]
    fn ordinary_text_is_not_emoji() {
        assert_eq!(emoji_at("今起きた"), None);
        assert_eq!(emoji_at("a"), None);
        assert_eq!(emoji_at(""), None);
        assert_eq!(emoji_at("\u{1F1EF}x"), None);
    }
}
