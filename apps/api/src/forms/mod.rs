//! Form-Fill Bridge: registry of external ad-cabinet forms and URL detection.
//!
//! A [`FormTarget`] maps ad fields to CSS selectors on a third-party page. The
//! built-in list can be replaced by a JSON file (`FORM_TARGETS_PATH`).

pub mod bridge;
pub mod handlers;
pub mod script;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use self::bridge::WriteMode;
use crate::config::Config;
use crate::models::ad::AdField;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormTarget {
    pub id: String,
    pub label: String,
    /// `*` matches any run of characters, e.g. `https://ads.vk.com/*`.
    pub url_patterns: Vec<String>,
    /// CSS selector per ad field.
    pub fields: BTreeMap<AdField, String>,
    /// `true` when the fields are rich-text (contenteditable) editors rather
    /// than native inputs and textareas.
    #[serde(default)]
    pub editable: bool,
    /// Platform ids whose records may be written into this form.
    pub accepts: Vec<String>,
}

impl FormTarget {
    pub fn accepts_platform(&self, platform_id: &str) -> bool {
        self.accepts.iter().any(|p| p == platform_id)
    }

    pub fn write_mode(&self) -> WriteMode {
        if self.editable {
            WriteMode::RichText
        } else {
            WriteMode::Plain
        }
    }

    fn matches(&self, page: &str) -> bool {
        self.url_patterns.iter().any(|p| wildcard_match(p, page))
    }
}

#[derive(Debug, Clone)]
pub struct FormRegistry {
    targets: Vec<FormTarget>,
}

impl FormRegistry {
    pub fn new(targets: Vec<FormTarget>) -> Self {
        Self { targets }
    }

    /// Built-in targets, or the configured file when `FORM_TARGETS_PATH` is set.
    pub fn load(config: &Config) -> anyhow::Result<Self> {
        match &config.form_targets_path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read form targets from {}", path.display()))?;
        let targets: Vec<FormTarget> = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed form targets in {}", path.display()))?;
        info!("Loaded {} form target(s) from {}", targets.len(), path.display());
        Ok(Self::new(targets))
    }

    pub fn builtin() -> Self {
        let vk_fields = BTreeMap::from([
            (AdField::Headline, r#"textarea[name="title"], input[name="title"]"#.to_string()),
            (AdField::Text, r#"textarea[name="description"], textarea[name="text"]"#.to_string()),
            (AdField::LongDescription, r#"textarea[name="long_description"]"#.to_string()),
            (AdField::ButtonText, r#"input[name="cta_text"]"#.to_string()),
        ]);
        let direct_fields = BTreeMap::from([
            (AdField::Headline, r#"input[name="title"]"#.to_string()),
            (AdField::Subheadline, r#"input[name="title_extension"]"#.to_string()),
            (AdField::Text, r#"textarea[name="body"]"#.to_string()),
        ]);
        Self::new(vec![
            FormTarget {
                id: "vk_ads".into(),
                label: "VK Реклама".into(),
                url_patterns: vec!["https://ads.vk.com/*".into()],
                fields: vk_fields,
                editable: false,
                accepts: ["vk_universal", "vk_site", "vk_lead", "vk_carousel"]
                    .map(String::from)
                    .to_vec(),
            },
            FormTarget {
                id: "yandex_direct".into(),
                label: "Яндекс Директ".into(),
                url_patterns: vec![
                    "https://direct.yandex.ru/*".into(),
                    "https://direct.yandex.com/*".into(),
                ],
                fields: direct_fields,
                editable: false,
                accepts: ["yandex_search", "yandex_rsya"].map(String::from).to_vec(),
            },
        ])
    }

    pub fn targets(&self) -> &[FormTarget] {
        &self.targets
    }

    pub fn get(&self, id: &str) -> Option<&FormTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// First target whose pattern matches the tab URL. Only http(s) pages qualify;
    /// query string and fragment are ignored.
    pub fn detect(&self, tab_url: &str) -> Option<&FormTarget> {
        let url = Url::parse(tab_url).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let page = format!("{}://{}{}", url.scheme(), url.host_str()?, url.path());
        let found = self.targets.iter().find(|t| t.matches(&page));
        debug!("Form target for {page}: {:?}", found.map(|t| &t.id));
        found
    }
}

/// `*` matches any (possibly empty) run of characters; everything else is literal.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return text.is_empty();
    };
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };
    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        // No `*` at all.
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
