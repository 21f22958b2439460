use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ad::AdRecord;
use crate::platforms::AdStyle;

/// Max chars of the description used as the default entry label.
pub const LABEL_MAX_CHARS: usize = 40;

/// One complete generation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Creation time in unix milliseconds; doubles as the stable identity of the entry.
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub style: AdStyle,
    pub platforms: Vec<String>,
    /// Full input the session was generated from; variant requests reuse it.
    #[serde(default)]
    pub description: String,
    pub texts: Vec<AdRecord>,
    #[serde(default)]
    pub meta: String,
}

impl HistoryEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        style: AdStyle,
        platforms: Vec<String>,
        description: &str,
        texts: Vec<AdRecord>,
        meta: String,
    ) -> Self {
        Self {
            id: timestamp.timestamp_millis(),
            timestamp,
            label: default_label(description),
            style,
            platforms,
            description: description.to_string(),
            texts,
            meta,
        }
    }
}

/// First [`LABEL_MAX_CHARS`] characters of the description.
pub fn default_label(description: &str) -> String {
    description.trim().chars().take(LABEL_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_label_truncates_by_chars_not_bytes() {
        let description = "Требуется оператор call-центра на входящую линию, график 2/2";
        let label = default_label(description);
        assert_eq!(label.chars().count(), LABEL_MAX_CHARS);
        assert!(description.starts_with(&label));
    }

    #[test]
    fn test_entry_id_is_creation_millis() {
        let ts = Utc::now();
        let entry = HistoryEntry::new(ts, AdStyle::Balanced, vec![], "Курьер", vec![], String::new());
        assert_eq!(entry.id, ts.timestamp_millis());
        assert_eq!(entry.label, "Курьер");
    }
}
