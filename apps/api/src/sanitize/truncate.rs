use unicode_segmentation::UnicodeSegmentation;

use super::whitespace::normalize_whitespace;
use crate::models::ad::display_len;

/// Cuts `value` down to `max` UTF-16 units if it is over the limit.
///
/// Prefers the last line break, period or exclamation mark that sits at or
/// after 60% of `max`; without one the cut falls at the raw max (never inside
/// a grapheme cluster). Returns `None` when the value already fits.
pub fn truncate_to_limit(value: &str, max: usize) -> Option<String> {
    if display_len(value) <= max {
        return None;
    }

    let prefix = &value[..prefix_end(value, max)];

    let mut cut = prefix;
    let mut units = 0;
    for (idx, c) in prefix.char_indices() {
        if matches!(c, '\n' | '.' | '!') && units * 5 >= max * 3 {
            cut = &prefix[..idx + c.len_utf8()];
        }
        units += c.len_utf16();
    }

    let mut out = cut.trim().to_string();
    if balance_bold_markers(&mut out) {
        // The dropped marker may have sat between two spaces.
        out = normalize_whitespace(&out);
    }
    Some(out)
}

/// Byte offset of the longest grapheme-aligned prefix that fits in `max` UTF-16 units.
fn prefix_end(value: &str, max: usize) -> usize {
    let mut units = 0;
    let mut end = 0;
    for (idx, g) in value.grapheme_indices(true) {
        let width: usize = g.encode_utf16().count();
        if units + width > max {
            break;
        }
        units += width;
        end = idx + g.len();
    }
    end
}

/// Drops the last `**` when a cut left a bold span unterminated.
fn balance_bold_markers(value: &mut String) -> bool {
    if value.matches("**").count() % 2 == 0 {
        return false;
    }
    match value.rfind("**") {
        Some(pos) => {
            value.replace_range(pos..pos + 2, "");
            true
        }
        None => false,
    }
}
