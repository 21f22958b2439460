//! Grapheme-aware emoji detection and the VK-specific emoji transforms.
//!
//! Emoji are matched per extended grapheme cluster so ZWJ sequences, skin-tone
//! modifiers, flags and keycaps are always kept or removed as one unit.

use std::collections::HashSet;
use std::sync::OnceLock;

use unicode_segmentation::UnicodeSegmentation;

const VARIATION_SELECTOR_16: char = '\u{FE0F}';
const KEYCAP: char = '\u{20E3}';

/// Emoji the VK moderation accepts in body text for HR ads.
const APPROVED_EMOJI: &[&str] = &[
    "📌", "📍", "✅", "✔️", "☑️", "💼", "💰", "💵", "💳", "💸", "🏢", "🏠", "🏭", "🏥", "🏪",
    "🕐", "⏰", "⏳", "📅", "🗓", "📞", "📱", "💻", "📩", "✉️", "👉", "👇", "👋", "👍", "🙌",
    "🤝", "👥", "👨‍💻", "👩‍💻", "🔥", "⭐", "🌟", "✨", "🚀", "💪", "🎯", "📈", "🎓", "📚", "💡",
    "🏆", "🎁", "☕", "🍽", "🚗", "🚚", "🛒", "📦", "🔧", "🛠", "⚡", "❗", "❓", "🔹", "🔸",
    "▶️", "😊", "🙂",
];

fn approved() -> &'static HashSet<String> {
    static APPROVED: OnceLock<HashSet<String>> = OnceLock::new();
    APPROVED.get_or_init(|| APPROVED_EMOJI.iter().map(|e| canonical(e)).collect())
}

/// Emoji with the presentation selector dropped, so `✔️` and `✔` compare equal.
fn canonical(grapheme: &str) -> String {
    grapheme.chars().filter(|&c| c != VARIATION_SELECTOR_16).collect()
}

/// Approximation of Unicode `Extended_Pictographic` over the ranges that
/// matter for ad copy.
fn is_pictographic(c: char) -> bool {
    matches!(
        c as u32,
        0x00A9
            | 0x00AE
            | 0x203C
            | 0x2049
            | 0x2122
            | 0x2139
            | 0x2194..=0x2199
            | 0x21A9..=0x21AA
            | 0x231A..=0x231B
            | 0x2328
            | 0x23CF
            | 0x23E9..=0x23FA
            | 0x24C2
            | 0x25AA..=0x25AB
            | 0x25B6
            | 0x25C0
            | 0x25FB..=0x25FE
            | 0x2600..=0x27BF
            | 0x2934..=0x2935
            | 0x2B05..=0x2B07
            | 0x2B1B..=0x2B1C
            | 0x2B50
            | 0x2B55
            | 0x3030
            | 0x303D
            | 0x3297
            | 0x3299
            | 0x1F000..=0x1FAFF
            | 0x1FC00..=0x1FFFD
    )
}

/// True when the grapheme cluster renders as an emoji.
pub fn is_emoji(grapheme: &str) -> bool {
    let Some(first) = grapheme.chars().next() else {
        return false;
    };
    if is_pictographic(first) {
        return true;
    }
    // Keycaps (1️⃣) and text symbols forced into emoji presentation.
    grapheme.contains(KEYCAP) || (grapheme.chars().count() > 1 && grapheme.contains(VARIATION_SELECTOR_16))
}

pub fn is_approved(grapheme: &str) -> bool {
    approved().contains(&canonical(grapheme))
}

pub fn count_emoji(value: &str) -> usize {
    value.graphemes(true).filter(|g| is_emoji(g)).count()
}

/// Drops every emoji grapheme for which `remove` returns true.
pub fn remove_emoji_where(value: &str, remove: impl Fn(&str) -> bool) -> String {
    value
        .graphemes(true)
        .filter(|g| !(is_emoji(g) && remove(g)))
        .collect()
}

/// Removes up to `n` emoji starting from the end. Returns the new text and how many were removed.
pub fn remove_trailing_emoji(value: &str, n: usize) -> (String, usize) {
    if n == 0 {
        return (value.to_string(), 0);
    }
    let graphemes: Vec<&str> = value.graphemes(true).collect();
    let mut drop = vec![false; graphemes.len()];
    let mut removed = 0;
    for (i, g) in graphemes.iter().enumerate().rev() {
        if removed == n {
            break;
        }
        if is_emoji(g) {
            drop[i] = true;
            removed += 1;
        }
    }
    let kept = graphemes
        .iter()
        .zip(drop)
        .filter_map(|(g, d)| (!d).then_some(*g))
        .collect();
    (kept, removed)
}

/// Rewrites lines that begin with an emoji as `— <emoji> <rest>`.
///
/// The VK validator strips a leading emoji on submit and then rejects the orphaned
/// space; placing the emoji after a dash keeps it.
pub fn fix_line_start_emoji(value: &str) -> String {
    value
        .split('\n')
        .map(|line| {
            let mut graphemes = line.graphemes(true);
            match graphemes.next() {
                Some(first) if is_emoji(first) => {
                    let rest = graphemes.as_str().trim_start();
                    if rest.is_empty() {
                        format!("— {first}")
                    } else {
                        format!("— {first} {rest}")
                    }
                }
                _ => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
