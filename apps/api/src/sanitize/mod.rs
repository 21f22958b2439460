//! Text Sanitizers: idempotent transforms that make LLM copy acceptable to the
//! destination platforms.
//!
//! Order matters; later steps assume the earlier ones already ran:
//! 1. emoji whitelist (group rules)
//! 2. whitespace normalization (all platforms), then single line breaks where the platform wants them
//! 3. line-start emoji repair (group rules)
//! 4. emoji budget (group rules)
//! 5. hard truncation to the platform max (all platforms)
//!
//! Sanitizers never fail: absent fields are skipped, unknown platforms only get
//! whitespace normalization.

pub mod emoji;
pub mod truncate;
pub mod whitespace;

use tracing::debug;

use crate::models::ad::{AdField, AdRecord, FieldSet};
use crate::platforms::{self, PlatformSpec};

const TITLE_FIELDS: [AdField; 2] = [AdField::Headline, AdField::ButtonText];
const BODY_FIELDS: [AdField; 2] = [AdField::Text, AdField::LongDescription];

/// Runs the full chain for the record's platform.
pub fn sanitize_record(record: &mut AdRecord) -> &mut AdRecord {
    sanitize_fields(&record.system, &mut record.fields);
    record
}

/// Runs the full chain on a bare field set belonging to `platform_id`.
pub fn sanitize_fields(platform_id: &str, fields: &mut FieldSet) {
    let Some(spec) = platforms::lookup(platform_id) else {
        debug!("Unknown platform '{platform_id}': whitespace normalization only");
        normalize_all(fields);
        return;
    };

    enforce_emoji_whitelist(spec, fields);
    normalize_all(fields);
    if spec.single_line_breaks {
        map_fields(fields, &BODY_FIELDS, whitespace::single_line_breaks);
    }
    repair_line_start_emoji(spec, fields);
    cap_emoji_budget(spec, fields);
    truncate_to_limits(spec, fields);
}

/// Step 1: no emoji at all in titles, only approved emoji in body text.
pub fn enforce_emoji_whitelist(spec: &PlatformSpec, fields: &mut FieldSet) {
    let rules = spec.rules();
    if rules.strip_title_emoji {
        map_fields(fields, &TITLE_FIELDS, |v| {
            whitespace::normalize_whitespace(&emoji::remove_emoji_where(v, |_| true))
        });
    }
    if rules.emoji_whitelist {
        map_fields(fields, &BODY_FIELDS, |v| {
            whitespace::normalize_whitespace(&emoji::remove_emoji_where(v, |g| {
                !emoji::is_approved(g)
            }))
        });
    }
}

/// Step 2 applied to every present field.
pub fn normalize_all(fields: &mut FieldSet) {
    map_fields(fields, &AdField::ALL, whitespace::normalize_whitespace);
}

/// Step 3: `📌Текст` becomes `— 📌 Текст` in body fields.
pub fn repair_line_start_emoji(spec: &PlatformSpec, fields: &mut FieldSet) {
    if spec.rules().repair_line_start_emoji {
        map_fields(fields, &BODY_FIELDS, emoji::fix_line_start_emoji);
    }
}

/// Step 4: keeps at most the group budget of emoji across `text` + `long_description`,
/// removing from the end of the content (long description first).
pub fn cap_emoji_budget(spec: &PlatformSpec, fields: &mut FieldSet) {
    let Some(budget) = spec.rules().emoji_budget else {
        return;
    };
    let total: usize = BODY_FIELDS
        .iter()
        .filter_map(|&f| fields.get(f))
        .map(emoji::count_emoji)
        .sum();
    if total <= budget {
        return;
    }

    let mut excess = total - budget;
    debug!("{}: {excess} emoji over budget {budget}", spec.id);
    for field in BODY_FIELDS.into_iter().rev() {
        if excess == 0 {
            break;
        }
        if let Some(value) = fields.slot_mut(field) {
            let (trimmed, removed) = emoji::remove_trailing_emoji(value, excess);
            *value = whitespace::normalize_whitespace(&trimmed);
            excess -= removed;
        }
    }
}

/// Step 5: every field with a defined max ends up within it.
pub fn truncate_to_limits(spec: &PlatformSpec, fields: &mut FieldSet) {
    for (field, limit) in spec.fields() {
        if let Some(value) = fields.slot_mut(field) {
            if let Some(mut cut) = truncate::truncate_to_limit(value, limit.max) {
                debug!("{}.{field}: truncated to {} units", spec.id, limit.max);
                if spec.single_line_breaks && BODY_FIELDS.contains(&field) {
                    cut = whitespace::single_line_breaks(&cut);
                }
                *value = cut;
            }
        }
    }
}

fn map_fields(fields: &mut FieldSet, which: &[AdField], f: impl Fn(&str) -> String) {
    for &field in which {
        if let Some(value) = fields.slot_mut(field) {
            let next = f(value);
            if next != *value {
                debug!("Sanitized field '{field}'");
                *value = next;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ad::display_len;

    fn record(system: &str, fields: FieldSet) -> AdRecord {
        AdRecord::new(system, fields)
    }

    fn noisy_vk_record() -> AdRecord {
        record(
            "vk_universal",
            FieldSet {
                headline: Some("🔥 Ищем\u{00A0}курьеров 🚀".to_string()),
                text: Some(
                    "📌Доставка по району\r\n\r\n\r\n🍺 Пятница   каждый день  \n✅ Оплата ежедневно 💰 🎁 🚀 ⭐"
                        .to_string(),
                ),
                long_description: Some(format!("💼 {}\n🔥 Звоните", "Стабильно. ".repeat(60))),
                ..Default::default()
            },
        )
    }

    fn assert_clean_whitespace(value: &str) {
        assert!(!value.contains("\n\n\n"), "3+ newlines in {value:?}");
        for line in value.split('\n') {
            assert_eq!(line, line.trim(), "untrimmed line {line:?}");
            assert!(!line.contains("  "), "double space in {line:?}");
        }
        assert!(value
            .chars()
            .all(|c| c == ' ' || c == '\n' || !(c.is_whitespace() || c == '\u{200B}' || c == '\u{FEFF}')));
    }

    #[test]
    fn test_vk_titles_have_no_emoji() {
        let mut r = noisy_vk_record();
        sanitize_record(&mut r);
        assert_eq!(r.fields.headline.as_deref(), Some("Ищем курьеров"));
    }

    #[test]
    fn test_vk_body_only_approved_emoji_within_budget() {
        let mut r = noisy_vk_record();
        sanitize_record(&mut r);
        let text = r.fields.text.as_deref().unwrap();
        let long = r.fields.long_description.as_deref().unwrap();
        assert!(!text.contains('🍺'));
        let total = emoji::count_emoji(text) + emoji::count_emoji(long);
        assert!(total <= platforms::DEFAULT_EMOJI_BUDGET, "total emoji {total}");
        for value in [text, long] {
            use unicode_segmentation::UnicodeSegmentation;
            for g in value.graphemes(true).filter(|g| emoji::is_emoji(g)) {
                assert!(emoji::is_approved(g), "{g} not approved");
            }
        }
    }

    #[test]
    fn test_vk_line_start_emoji_is_repaired() {
        let mut r = noisy_vk_record();
        sanitize_record(&mut r);
        let text = r.fields.text.as_deref().unwrap();
        assert!(text.starts_with("— 📌 Доставка по району"));
        for line in text.split('\n') {
            use unicode_segmentation::UnicodeSegmentation;
            let first = line.graphemes(true).next().unwrap_or("");
            assert!(!emoji::is_emoji(first), "line starts with emoji: {line:?}");
        }
    }

    #[test]
    fn test_vk_universal_uses_single_line_breaks() {
        let mut r = noisy_vk_record();
        sanitize_record(&mut r);
        assert!(!r.fields.text.as_deref().unwrap().contains("\n\n"));
    }

    #[test]
    fn test_whitespace_invariants_hold_for_all_fields() {
        let mut r = noisy_vk_record();
        sanitize_record(&mut r);
        for (_, value) in r.fields.present() {
            assert_clean_whitespace(value);
        }
    }

    #[test]
    fn test_all_fields_within_platform_max() {
        let mut r = noisy_vk_record();
        sanitize_record(&mut r);
        let spec = platforms::lookup("vk_universal").unwrap();
        for (field, limit) in spec.fields() {
            if let Some(value) = r.fields.get(field) {
                assert!(display_len(value) <= limit.max, "{field} over limit");
            }
        }
    }

    #[test]
    fn test_chain_is_idempotent() {
        for system in ["vk_universal", "vk_lead", "telegram_seeds", "yandex_search", "unknown"] {
            let mut r = noisy_vk_record();
            r.system = system.to_string();
            r.fields.button_text = Some("✅ Откликнуться  сейчас".to_string());
            sanitize_record(&mut r);
            let once = r.clone();
            sanitize_record(&mut r);
            assert_eq!(r, once, "chain not idempotent for {system}");
        }
    }

    #[test]
    fn test_chain_is_idempotent_with_cut_bold_markup() {
        let mut r = record(
            "tgads",
            FieldSet {
                headline: Some("Платим ** каждую неделю без задержек и штрафов".to_string()),
                text: Some(format!("{}\n**\nЗвоните **сейчас**", "Смены рядом с домом. ".repeat(7))),
                ..Default::default()
            },
        );
        sanitize_record(&mut r);
        let once = r.clone();
        assert_eq!(once.fields.text.as_deref(), Some("Смены рядом с домом. ".repeat(7).trim()));
        for (_, value) in once.fields.present() {
            assert_clean_whitespace(value);
        }
        sanitize_record(&mut r);
        assert_eq!(r, once);
    }

    #[test]
    fn test_emoji_budget_removes_long_description_first() {
        let spec = platforms::lookup("vk_universal").unwrap();
        let mut fields = FieldSet {
            text: Some("Курьер ✅ 💰 📌".to_string()),
            long_description: Some("Бонусы 🎁 ⭐ 🚀 🔥".to_string()),
            ..Default::default()
        };
        cap_emoji_budget(spec, &mut fields);
        assert_eq!(fields.text.as_deref(), Some("Курьер ✅ 💰 📌"));
        assert_eq!(fields.long_description.as_deref(), Some("Бонусы 🎁 ⭐"));
    }

    #[test]
    fn test_emoji_budget_spills_into_text() {
        let spec = platforms::lookup("vk_universal").unwrap();
        let mut fields = FieldSet {
            text: Some("✅ 💰 📌 🎁 ⭐ 🚀 Звоните".to_string()),
            long_description: Some("🔥 Горячо".to_string()),
            ..Default::default()
        };
        cap_emoji_budget(spec, &mut fields);
        assert_eq!(fields.long_description.as_deref(), Some("Горячо"));
        assert_eq!(fields.text.as_deref(), Some("✅ 💰 📌 🎁 ⭐ Звоните"));
    }

    #[test]
    fn test_telegram_keeps_emoji_but_enforces_limits() {
        let mut r = record(
            "tgads",
            FieldSet {
                headline: Some("🚀 Курьеры в Москве — выплаты каждый день, без опыта".to_string()),
                text: Some("🍺 Работа рядом с домом.\n\nЗвоните!".to_string()),
                ..Default::default()
            },
        );
        sanitize_record(&mut r);
        let headline = r.fields.headline.as_deref().unwrap();
        assert!(headline.starts_with("🚀"));
        assert!(display_len(headline) <= 40);
        assert_eq!(r.fields.text.as_deref(), Some("🍺 Работа рядом с домом.\nЗвоните!"));
    }

    #[test]
    fn test_yandex_keeps_blank_lines_and_emoji() {
        let mut r = record(
            "yandex_rsya",
            FieldSet {
                text: Some("🚀 Курьеры\n\nОплата".to_string()),
                ..Default::default()
            },
        );
        sanitize_record(&mut r);
        assert_eq!(r.fields.text.as_deref(), Some("🚀 Курьеры\n\nОплата"));
    }

    #[test]
    fn test_long_description_of_600_chars_fits_500() {
        let mut r = record(
            "vk_universal",
            FieldSet {
                long_description: Some("A".repeat(600)),
                ..Default::default()
            },
        );
        sanitize_record(&mut r);
        assert_eq!(r.fields.long_description.as_deref().unwrap().len(), 500);
    }

    #[test]
    fn test_unknown_platform_only_normalizes_whitespace() {
        let mut r = record(
            "myspace",
            FieldSet {
                headline: Some("🔥  Очень длинный заголовок ".repeat(10)),
                ..Default::default()
            },
        );
        sanitize_record(&mut r);
        let headline = r.fields.headline.as_deref().unwrap();
        assert!(headline.starts_with("🔥 Очень"));
        assert!(display_len(headline) > 100);
    }
}
