//! Platform Registry: static per-platform field limits, grouping and formatting notes.
//!
//! Everything limit-dependent (prompt building, sanitizing, truncation, gauges)
//! reads from this table. Adding a field limit to a platform only changes which
//! sanitizer steps touch that platform; no pipeline code has to change.

use serde::{Deserialize, Serialize};

use crate::models::ad::{display_len, AdField};

/// Coarse bucket of platforms sharing moderation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    Vk,
    Yandex,
    Tg,
}

/// Moderation rules a group imposes on generated copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupRules {
    /// Headline and button text may not contain any emoji.
    pub strip_title_emoji: bool,
    /// Body fields may only use emoji from the approved list.
    pub emoji_whitelist: bool,
    /// Lines must not start with an emoji (the platform validator strips it).
    pub repair_line_start_emoji: bool,
    /// Max emoji across `text` + `long_description`.
    pub emoji_budget: Option<usize>,
}

pub const DEFAULT_EMOJI_BUDGET: usize = 5;

impl Group {
    pub fn rules(self) -> GroupRules {
        match self {
            Group::Vk => GroupRules {
                strip_title_emoji: true,
                emoji_whitelist: true,
                repair_line_start_emoji: true,
                emoji_budget: Some(DEFAULT_EMOJI_BUDGET),
            },
            Group::Yandex | Group::Tg => GroupRules {
                strip_title_emoji: false,
                emoji_whitelist: false,
                repair_line_start_emoji: false,
                emoji_budget: None,
            },
        }
    }
}

/// `[min, max]` character window for one field, plus an optional target length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldLimit {
    pub min: usize,
    pub max: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<usize>,
}

impl FieldLimit {
    const fn new(min: usize, max: usize) -> Self {
        Self {
            min,
            max,
            target: None,
        }
    }

    const fn with_target(min: usize, max: usize, target: usize) -> Self {
        Self {
            min,
            max,
            target: Some(target),
        }
    }
}

/// Immutable description of one ad-buying destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub group: Group,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<FieldLimit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subheadline: Option<FieldLimit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<FieldLimit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_description: Option<FieldLimit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_text: Option<FieldLimit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatting_notes: Option<&'static str>,
    /// Body text must use single line breaks only (no blank lines).
    pub single_line_breaks: bool,
}

impl PlatformSpec {
    pub fn limit(&self, field: AdField) -> Option<FieldLimit> {
        match field {
            AdField::Headline => self.headline,
            AdField::Subheadline => self.subheadline,
            AdField::Text => self.text,
            AdField::LongDescription => self.long_description,
            AdField::ButtonText => self.button_text,
        }
    }

    /// Fields this platform defines, in canonical order.
    pub fn fields(&self) -> impl Iterator<Item = (AdField, FieldLimit)> + '_ {
        AdField::ALL
            .into_iter()
            .filter_map(move |f| self.limit(f).map(|l| (f, l)))
    }

    pub fn rules(&self) -> GroupRules {
        self.group.rules()
    }
}

/// Copywriting style requested by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdStyle {
    Creative,
    #[default]
    Balanced,
    Formal,
}

impl AdStyle {
    pub fn label(self) -> &'static str {
        match self {
            AdStyle::Creative => "Креативный",
            AdStyle::Balanced => "Сбалансированный",
            AdStyle::Formal => "Формальный",
        }
    }
}

const BLANK: PlatformSpec = PlatformSpec {
    id: "",
    label: "",
    group: Group::Vk,
    headline: None,
    subheadline: None,
    text: None,
    long_description: None,
    button_text: None,
    formatting_notes: None,
    single_line_breaks: false,
};

static PLATFORMS: &[PlatformSpec] = &[
    PlatformSpec {
        id: "vk_universal",
        label: "VK Универсальная",
        group: Group::Vk,
        headline: Some(FieldLimit::new(3, 40)),
        text: Some(FieldLimit::new(3, 220)),
        long_description: Some(FieldLimit::with_target(3, 500, 400)),
        formatting_notes: Some("Без эмодзи в заголовке. Не начинай строки с эмодзи."),
        single_line_breaks: true,
        ..BLANK
    },
    PlatformSpec {
        id: "vk_site",
        label: "VK Сайт",
        group: Group::Vk,
        headline: Some(FieldLimit::new(3, 25)),
        text: Some(FieldLimit::new(3, 90)),
        ..BLANK
    },
    PlatformSpec {
        id: "vk_lead",
        label: "VK Лид-формы",
        group: Group::Vk,
        headline: Some(FieldLimit::new(3, 60)),
        text: Some(FieldLimit::new(3, 220)),
        button_text: Some(FieldLimit::new(3, 30)),
        formatting_notes: Some("Текст кнопки — короткий призыв к действию без эмодзи."),
        ..BLANK
    },
    PlatformSpec {
        id: "vk_carousel",
        label: "VK Карусель",
        group: Group::Vk,
        headline: Some(FieldLimit::new(3, 40)),
        text: Some(FieldLimit::new(3, 47)),
        ..BLANK
    },
    PlatformSpec {
        id: "yandex_search",
        label: "Яндекс Поиск",
        group: Group::Yandex,
        headline: Some(FieldLimit::new(1, 56)),
        subheadline: Some(FieldLimit::new(1, 30)),
        text: Some(FieldLimit::new(1, 81)),
        ..BLANK
    },
    PlatformSpec {
        id: "yandex_rsya",
        label: "Яндекс РСЯ",
        group: Group::Yandex,
        headline: Some(FieldLimit::new(1, 56)),
        text: Some(FieldLimit::new(1, 81)),
        ..BLANK
    },
    PlatformSpec {
        id: "telegram_seeds",
        label: "Telegram Посевы",
        group: Group::Tg,
        headline: Some(FieldLimit::new(1, 56)),
        text: Some(FieldLimit::with_target(1, 764, 500)),
        formatting_notes: Some(
            "Используй переносы строк, 1-2 ключевых фразы **жирным**, 1-2 эмодзи.",
        ),
        single_line_breaks: true,
        ..BLANK
    },
    PlatformSpec {
        id: "tgads",
        label: "Telegram Ads",
        group: Group::Tg,
        headline: Some(FieldLimit::new(1, 40)),
        text: Some(FieldLimit::new(1, 160)),
        formatting_notes: Some(
            "Заголовок — короткая цепляющая фраза. Не дублируй заголовок в тексте. 1 эмодзи.",
        ),
        single_line_breaks: true,
        ..BLANK
    },
];

/// Every registered platform, in display order.
pub fn all() -> &'static [PlatformSpec] {
    PLATFORMS
}

pub fn lookup(platform_id: &str) -> Option<&'static PlatformSpec> {
    PLATFORMS.iter().find(|p| p.id == platform_id)
}

pub fn group_of(platform_id: &str) -> Option<Group> {
    lookup(platform_id).map(|p| p.group)
}

// ────────────────────────────────────────────────────────────────────────────
// Field gauges
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GaugeLevel {
    Ok,
    /// Above 90% of the max.
    Warn,
    Over,
}

/// Fill level of one field against its platform max; `Over` drives the shorten action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldGauge {
    pub field: AdField,
    pub len: usize,
    pub max: usize,
    pub level: GaugeLevel,
}

impl FieldGauge {
    pub fn measure(field: AdField, value: &str, limit: FieldLimit) -> Self {
        let len = display_len(value);
        let level = if len > limit.max {
            GaugeLevel::Over
        } else if len * 10 > limit.max * 9 {
            GaugeLevel::Warn
        } else {
            GaugeLevel::Ok
        };
        Self {
            field,
            len,
            max: limit.max,
            level,
        }
    }
}
