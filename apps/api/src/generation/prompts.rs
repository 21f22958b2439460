// All LLM prompt constants for ad text generation, variants and shortening.
// Reuses cross-cutting fragments from llm_client::prompts.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::llm_client::prompts::{with_json_reply, RUSSIAN_ONLY};
use crate::models::ad::{AdField, FieldSet};
use crate::platforms::{AdStyle, PlatformSpec};

/// Default writer prompt. Users may replace it through the settings API.
pub const AD_SYSTEM_PROMPT: &str = r#"Ты опытный копирайтер, специализирующийся на HR-рекламе и вакансиях. Твоя задача — создавать эффективные рекламные тексты для размещения на различных рекламных площадках.

Стили написания:
- Креативный — яркий, эмоциональный язык. Метафоры и образные выражения. Яркие заголовки. Сильный призыв к действию.
- Формальный — строгий деловой стиль. Четкие информативные заголовки. Корректный призыв к действию. Фокус на фактах.
- Сбалансированный — эффективный и лаконичный. Короткие цепляющие заголовки. Призыв к действию без кликбейта.

Базовые правила:
1. Текст ТОЛЬКО на русском языке
2. Строго соблюдай лимиты символов (max_chars) для каждого поля каждой рекламной системы; если задан target_chars — ориентируйся на него
3. Каждый текст содержит призыв к действию
4. Без кликбейта и манипуляций
5. Фокус на выгодах для соискателя
6. Соблюдай formatting_notes площадки, если они указаны
7. Заполняй только поля, перечисленные у площадки в fields

Формат ответа — строго JSON без markdown-обёртки:
{"texts":[{"system":"точный_id_системы","headline":"заголовок","subheadline":"подзаголовок","text":"основной текст","long_description":"длинное описание","button_text":"текст кнопки"}]}

В поле system — только точный id из запроса. Генерируй по одному блоку для каждой запрошенной системы."#;

/// Appended to the structured prompt when asking for an alternate draft of one card.
pub const VARIANT_INSTRUCTION: &str =
    "Создай ДРУГОЙ вариант текстов, отличающийся от предыдущих по тону и формулировкам.";

const SHORTEN_SYSTEM_BASE: &str = "Ты — редактор-сократитель. Задача — максимально сократить рекламный текст, \
сохранив смысл и призыв к действию.\n\
ПРАВИЛА: Убери лишнее. Короткие синонимы. Без причастных оборотов. Без вводных.";

const SHORTEN_REPLY_SCHEMA: &str =
    r#"{"headline":"...","subheadline":"...(если есть)","text":"...","long_description":"...(если есть)","button_text":"...(если есть)"}"#;

/// Shortening prompt template.
/// Replace: {label}, {system}, {current}, {limits}
pub const SHORTEN_PROMPT_TEMPLATE: &str = "Площадка: {label} ({system})
ТЕКУЩИЕ ТЕКСТЫ:
{current}

ЛИМИТЫ:
{limits}

Создай МАКСИМАЛЬНО КОРОТКУЮ версию.";

/// Output budget of a shortening call.
pub const SHORTEN_MAX_TOKENS: u32 = 1024;

pub fn shorten_system_prompt() -> String {
    with_json_reply(&format!("{SHORTEN_SYSTEM_BASE}\n{RUSSIAN_ONLY}"), SHORTEN_REPLY_SCHEMA)
}

/// Builds the structured user turn:
/// `{task, input: {raw_description}, style, systems: [{id, label, fields, formatting_notes?}]}`.
pub fn build_structured_prompt(platforms: &[&PlatformSpec], style: AdStyle, description: &str) -> String {
    let systems: Vec<Value> = platforms
        .iter()
        .map(|spec| {
            let fields: BTreeMap<&str, Value> = spec
                .fields()
                .map(|(field, limit)| {
                    let budget = match limit.target {
                        Some(target) => json!({ "max_chars": limit.max, "target_chars": target }),
                        None => json!({ "max_chars": limit.max }),
                    };
                    (field.as_str(), budget)
                })
                .collect();

            let mut system = json!({ "id": spec.id, "label": spec.label, "fields": fields });
            if let Some(notes) = spec.formatting_notes {
                system["formatting_notes"] = json!(notes);
            }
            system
        })
        .collect();

    let prompt = json!({
        "task": "generate_ad_texts",
        "input": { "raw_description": description },
        "style": style.label(),
        "systems": systems,
    });
    format!("{prompt:#}")
}

/// Single-platform prompt asking for a new, different draft.
pub fn build_variant_prompt(spec: &PlatformSpec, style: AdStyle, description: &str) -> String {
    format!(
        "{}\n\n{VARIANT_INSTRUCTION}",
        build_structured_prompt(&[spec], style, description)
    )
}

/// Per-field ceiling line: the platform max with a 70% target.
fn shorten_limit_line(field: AdField, max: usize) -> String {
    let target = (max as f64 * 0.7).round() as usize;
    format!("{}: ≤{max} символов (цель: {target})", field.prompt_label())
}

/// Shortening prompt covering only the fields that are present and limited.
pub fn build_shorten_prompt(spec: &PlatformSpec, fields: &FieldSet) -> String {
    let current = fields
        .present()
        .map(|(field, value)| format!("{}: {value}", field.prompt_label()))
        .collect::<Vec<_>>()
        .join("\n");

    let limits = fields
        .present()
        .filter_map(|(field, _)| spec.limit(field).map(|l| shorten_limit_line(field, l.max)))
        .collect::<Vec<_>>()
        .join("\n");

    SHORTEN_PROMPT_TEMPLATE
        .replace("{label}", spec.label)
        .replace("{system}", spec.id)
        .replace("{current}", &current)
        .replace("{limits}", &limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::lookup;

    #[test]
    fn test_structured_prompt_shape() {
        let specs = [lookup("telegram_seeds").unwrap(), lookup("yandex_search").unwrap()];
        let prompt = build_structured_prompt(&specs, AdStyle::Balanced, "Курьер, Москва");
        let value: Value = serde_json::from_str(&prompt).unwrap();

        assert_eq!(value["task"], "generate_ad_texts");
        assert_eq!(value["input"]["raw_description"], "Курьер, Москва");
        assert_eq!(value["style"], "Сбалансированный");

        let seeds = &value["systems"][0];
        assert_eq!(seeds["id"], "telegram_seeds");
        assert_eq!(seeds["fields"]["text"]["max_chars"], 764);
        assert_eq!(seeds["fields"]["text"]["target_chars"], 500);
        assert!(seeds["formatting_notes"].as_str().unwrap().contains("жирным"));

        let search = &value["systems"][1];
        assert_eq!(search["fields"]["subheadline"]["max_chars"], 30);
        assert!(search["fields"]["headline"].get("target_chars").is_none());
        assert!(search.get("formatting_notes").is_none());
    }

    #[test]
    fn test_variant_prompt_asks_for_a_different_draft() {
        let prompt = build_variant_prompt(lookup("vk_site").unwrap(), AdStyle::Creative, "Кассир");
        assert!(prompt.ends_with(VARIANT_INSTRUCTION));
        assert!(prompt.contains("\"vk_site\""));
    }

    #[test]
    fn test_shorten_prompt_lists_present_fields_with_seventy_percent_target() {
        let fields = FieldSet {
            headline: Some("Ищем курьеров в Москве прямо сейчас".to_string()),
            text: Some("Длинный текст".to_string()),
            ..Default::default()
        };
        let prompt = build_shorten_prompt(lookup("yandex_rsya").unwrap(), &fields);
        assert!(prompt.starts_with("Площадка: Яндекс РСЯ (yandex_rsya)"));
        assert!(prompt.contains("Заголовок: ≤56 символов (цель: 39)"));
        assert!(prompt.contains("Текст: ≤81 символов (цель: 57)"));
        assert!(!prompt.contains("Подзаголовок"));
    }

    #[test]
    fn test_shorten_system_prompt_demands_json() {
        let system = shorten_system_prompt();
        assert!(system.starts_with("Ты — редактор-сократитель."));
        assert!(system.contains("\"headline\""));
    }
}
