use std::fmt;

use serde::{Deserialize, Serialize};

/// One text slot of an ad. Lengths are always measured in UTF-16 code units,
/// which is what the ad platforms count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdField {
    Headline,
    Subheadline,
    Text,
    LongDescription,
    ButtonText,
}

impl AdField {
    pub const ALL: [AdField; 5] = [
        AdField::Headline,
        AdField::Subheadline,
        AdField::Text,
        AdField::LongDescription,
        AdField::ButtonText,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AdField::Headline => "headline",
            AdField::Subheadline => "subheadline",
            AdField::Text => "text",
            AdField::LongDescription => "long_description",
            AdField::ButtonText => "button_text",
        }
    }

    /// Russian label used inside LLM prompts.
    pub fn prompt_label(self) -> &'static str {
        match self {
            AdField::Headline => "Заголовок",
            AdField::Subheadline => "Подзаголовок",
            AdField::Text => "Текст",
            AdField::LongDescription => "Длинное описание",
            AdField::ButtonText => "Текст кнопки",
        }
    }
}

impl fmt::Display for AdField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The present/absent text fields of an ad. Also the shape of a single variant snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_text: Option<String>,
}

impl FieldSet {
    pub fn get(&self, field: AdField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: AdField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    pub fn slot(&self, field: AdField) -> &Option<String> {
        match field {
            AdField::Headline => &self.headline,
            AdField::Subheadline => &self.subheadline,
            AdField::Text => &self.text,
            AdField::LongDescription => &self.long_description,
            AdField::ButtonText => &self.button_text,
        }
    }

    pub fn slot_mut(&mut self, field: AdField) -> &mut Option<String> {
        match field {
            AdField::Headline => &mut self.headline,
            AdField::Subheadline => &mut self.subheadline,
            AdField::Text => &mut self.text,
            AdField::LongDescription => &mut self.long_description,
            AdField::ButtonText => &mut self.button_text,
        }
    }

    /// Present fields in canonical order.
    pub fn present(&self) -> impl Iterator<Item = (AdField, &str)> + '_ {
        AdField::ALL
            .into_iter()
            .filter_map(move |f| self.get(f).map(|v| (f, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    /// Copies every present field of `other` over this set, leaving the rest untouched.
    pub fn merge_from(&mut self, other: &FieldSet) {
        for (field, value) in other.present() {
            self.set(field, Some(value.to_string()));
        }
    }
}

/// Alternative drafts of one record. At most [`VariantSet::MAX_VARIANTS`] entries,
/// `cursor` always points at an existing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSet {
    pub(crate) entries: Vec<FieldSet>,
    #[serde(rename = "vi")]
    pub(crate) cursor: usize,
}

/// One generated ad-copy unit for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdRecord {
    pub system: String,
    #[serde(flatten)]
    pub fields: FieldSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<VariantSet>,
}

impl AdRecord {
    pub fn new(system: impl Into<String>, fields: FieldSet) -> Self {
        Self {
            system: system.into(),
            fields,
            variants: None,
        }
    }
}

/// Length as the platforms count it: UTF-16 code units with `**` bold markers removed.
pub fn display_len(value: &str) -> usize {
    value.replace("**", "").encode_utf16().count()
}
