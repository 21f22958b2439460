//! Whitespace normalization. Ad platforms reject "extra whitespace", including
//! invisible Unicode spaces an editor would never notice.

/// Invisible code points that `char::is_whitespace` does not cover but the
/// platforms still count as spaces. ZWJ (U+200D) is deliberately absent: it
/// glues emoji sequences together.
const INVISIBLE_SPACES: &[char] = &['\u{200B}', '\u{2060}', '\u{180E}', '\u{FEFF}'];

fn is_space_like(c: char) -> bool {
    (c.is_whitespace() && c != '\n') || INVISIBLE_SPACES.contains(&c)
}

/// Normalizes line endings and spaces:
/// - CR/CRLF become LF, every other whitespace code point becomes an ASCII space
/// - runs of spaces collapse to one and every line is trimmed
/// - 3+ consecutive newlines collapse to one blank line
/// - the whole value is trimmed
pub fn normalize_whitespace(value: &str) -> String {
    let unified = value.replace("\r\n", "\n").replace('\r', "\n");
    let mapped: String = unified
        .chars()
        .map(|c| if is_space_like(c) { ' ' } else { c })
        .collect();

    let lines: Vec<String> = mapped.split('\n').map(collapse_spaces).collect();
    collapse_blank_lines(&lines.join("\n"), 2).trim().to_string()
}

/// Collapses runs of `\n` longer than `max_run` down to `max_run`.
pub fn collapse_blank_lines(value: &str, max_run: usize) -> String {
    let mut out = String::with_capacity(value.len());
    let mut run = 0;
    for c in value.chars() {
        if c == '\n' {
            run += 1;
            if run > max_run {
                continue;
            }
        } else {
            run = 0;
        }
        out.push(c);
    }
    out
}

/// Turns every blank-line paragraph break into a single line break.
pub fn single_line_breaks(value: &str) -> String {
    collapse_blank_lines(value, 1)
}

fn collapse_spaces(line: &str) -> String {
    line.split(' ')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crlf_and_cr_become_lf() {
        assert_eq!(normalize_whitespace("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_unicode_spaces_become_ascii() {
        let input = "от\u{00A0}80\u{2009}000\u{3000}руб\u{200B}в\u{2003}месяц";
        assert_eq!(normalize_whitespace(input), "от 80 000 руб в месяц");
    }

    #[test]
    fn test_tabs_vertical_tab_form_feed() {
        assert_eq!(normalize_whitespace("a\tb\u{000B}c\u{000C}d"), "a b c d");
    }

    #[test]
    fn test_trailing_and_leading_spaces_around_newlines() {
        assert_eq!(normalize_whitespace("строка   \n   вторая"), "строка\nвторая");
    }

    #[test]
    fn test_interior_runs_collapse() {
        assert_eq!(normalize_whitespace("много    пробелов  тут"), "много пробелов тут");
    }

    #[test]
    fn test_blank_line_runs_collapse() {
        assert_eq!(normalize_whitespace("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize_whitespace("a\n \n\u{00A0}\nb"), "a\n\nb");
    }

    #[test]
    fn test_bom_and_outer_whitespace_trimmed() {
        assert_eq!(normalize_whitespace("\u{FEFF}  текст \n"), "текст");
    }

    #[test]
    fn test_zwj_emoji_survives() {
        assert_eq!(normalize_whitespace("👩‍💻 IT"), "👩‍💻 IT");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_whitespace(" a \u{00A0} b\r\n\r\n\r\n c\t");
        assert_eq!(normalize_whitespace(&once), once);
    }

    #[test]
    fn test_single_line_breaks() {
        assert_eq!(single_line_breaks("a\n\nb\n\n\nc"), "a\nb\nc");
    }
}
