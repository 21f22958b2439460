//! History Store: capped, newest-first log of generation sessions with a cursor.
//!
//! Pure in-memory state; the workspace persists the entry list after every
//! mutation.

pub mod handlers;

use crate::models::history::HistoryEntry;

/// Oldest entries are dropped beyond this many.
pub const MAX_ENTRIES: usize = 15;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    /// `None` exactly when the store is empty.
    cursor: Option<usize>,
}

impl HistoryStore {
    /// Restores a persisted list, keeping at most [`MAX_ENTRIES`] and pointing at the newest.
    pub fn from_entries(mut entries: Vec<HistoryEntry>) -> Self {
        entries.truncate(MAX_ENTRIES);
        let cursor = (!entries.is_empty()).then_some(0);
        Self { entries, cursor }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|i| self.entries.get(i))
    }

    pub fn find_by_id_mut(&mut self, id: i64) -> Option<&mut HistoryEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Prepends `entry`, drops the oldest beyond the cap and moves the cursor to it.
    /// Ids stay unique: an id not above every existing one is bumped past them.
    pub fn push(&mut self, mut entry: HistoryEntry) {
        if let Some(max_id) = self.entries.iter().map(|e| e.id).max() {
            if entry.id <= max_id {
                entry.id = max_id + 1;
            }
        }
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_ENTRIES);
        self.cursor = Some(0);
    }

    /// Moves the cursor by `delta`, clamped to the list. Returns the new current entry.
    pub fn navigate(&mut self, delta: isize) -> Option<&HistoryEntry> {
        let current = self.cursor?;
        let last = self.entries.len() - 1;
        let target = current.saturating_add_signed(delta).min(last);
        self.cursor = Some(target);
        self.entries.get(target)
    }

    /// Returns false when `index` is out of range or the label is blank.
    pub fn rename(&mut self, index: usize, label: &str) -> bool {
        let label = label.trim();
        match self.entries.get_mut(index) {
            Some(entry) if !label.is_empty() => {
                entry.label = label.to_string();
                true
            }
            _ => false,
        }
    }

    /// Removes the entry at `index` and re-clamps the cursor.
    pub fn delete(&mut self, index: usize) -> Option<HistoryEntry> {
        if index >= self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(index);

        self.cursor = match (self.cursor, self.entries.len()) {
            (_, 0) => None,
            (Some(c), len) if index < c => Some((c - 1).min(len - 1)),
            (Some(c), len) => Some(c.min(len - 1)),
            (None, _) => Some(0),
        };
        Some(removed)
    }

    /// Case-insensitive substring match over the label and all record text.
    /// Returns `(index, entry)` pairs in original order; an empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<(usize, &HistoryEntry)> {
        let needle = query.trim().to_lowercase();
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| needle.is_empty() || mentions(entry, &needle))
            .collect()
    }
}

/// Each field is matched on its own, so a query never spans two of them.
fn mentions(entry: &HistoryEntry, needle: &str) -> bool {
    entry.label.to_lowercase().contains(needle)
        || entry
            .texts
            .iter()
            .flat_map(|r| r.fields.present())
            .any(|(_, value)| value.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::models::ad::{AdRecord, FieldSet};
    use crate::platforms::AdStyle;

    fn entry(n: i64, description: &str, text: &str) -> HistoryEntry {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(n);
        let record = AdRecord::new(
            "vk_site",
            FieldSet {
                text: Some(text.to_string()),
                ..Default::default()
            },
        );
        HistoryEntry::new(ts, AdStyle::Balanced, vec!["vk_site".into()], description, vec![record], String::new())
    }

    fn store_with(n: i64) -> HistoryStore {
        let mut store = HistoryStore::default();
        for i in 0..n {
            store.push(entry(i, &format!("Вакансия {i}"), "текст"));
        }
        store
    }

    #[test]
    fn test_push_prepends_and_caps() {
        let store = store_with(20);
        assert_eq!(store.len(), MAX_ENTRIES);
        assert_eq!(store.entries()[0].label, "Вакансия 19");
        assert_eq!(store.entries()[MAX_ENTRIES - 1].label, "Вакансия 5");
        assert_eq!(store.cursor(), Some(0));
    }

    #[test]
    fn test_navigate_clamps_without_wraparound() {
        let mut store = store_with(3);
        assert_eq!(store.navigate(-1).unwrap().label, "Вакансия 2");
        assert_eq!(store.navigate(5).unwrap().label, "Вакансия 0");
        assert_eq!(store.cursor(), Some(2));
        store.navigate(-1);
        assert_eq!(store.cursor(), Some(1));
    }

    #[test]
    fn test_navigate_on_empty_store() {
        let mut store = HistoryStore::default();
        assert!(store.navigate(1).is_none());
        assert_eq!(store.cursor(), None);
    }

    #[test]
    fn test_rename_rejects_blank_and_out_of_range() {
        let mut store = store_with(2);
        assert!(store.rename(1, "  Курьеры весна  "));
        assert_eq!(store.entries()[1].label, "Курьеры весна");
        assert!(!store.rename(1, "   "));
        assert!(!store.rename(9, "x"));
    }

    #[test]
    fn test_delete_only_entry_leaves_empty_store() {
        let mut store = store_with(1);
        assert!(store.delete(0).is_some());
        assert!(store.is_empty());
        assert_eq!(store.cursor(), None);
        assert!(store.current().is_none());
    }

    #[test]
    fn test_delete_before_cursor_keeps_current_entry() {
        let mut store = store_with(4);
        store.navigate(2);
        let current_id = store.current().unwrap().id;
        store.delete(0);
        assert_eq!(store.cursor(), Some(1));
        assert_eq!(store.current().unwrap().id, current_id);
    }

    #[test]
    fn test_delete_last_entry_under_cursor_clamps() {
        let mut store = store_with(3);
        store.navigate(2);
        store.delete(2);
        assert_eq!(store.cursor(), Some(1));
        assert!(store.delete(7).is_none());
    }

    #[test]
    fn test_search_matches_label_and_texts_case_insensitively() {
        let mut store = HistoryStore::default();
        store.push(entry(1, "Курьер Москва", "Доставка еды"));
        store.push(entry(2, "Кассир", "Работа в ТЦ рядом с домом"));
        store.push(entry(3, "Оператор", "Входящие звонки, ДОСТАВКА не нужна"));

        let hits: Vec<_> = store.search("доставка").into_iter().map(|(i, _)| i).collect();
        assert_eq!(hits, vec![0, 2]);
        assert_eq!(store.search("КАССИР").len(), 1);
        assert_eq!(store.search("").len(), 3);
        assert!(store.search("бариста").is_empty());
    }

    #[test]
    fn test_search_does_not_span_label_and_text() {
        let mut store = HistoryStore::default();
        store.push(entry(1, "Курьер", "Москва, доставка"));
        assert_eq!(store.search("курьер").len(), 1);
        assert_eq!(store.search("москва").len(), 1);
        assert!(store.search("курьер москва").is_empty());
    }

    #[test]
    fn test_push_keeps_ids_unique_within_one_millisecond() {
        let mut store = HistoryStore::default();
        store.push(entry(1, "Первый", "a"));
        store.push(entry(1, "Второй", "b"));
        store.push(entry(0, "Третий", "c"));
        let ids: Vec<i64> = store.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids[1], ids[2] + 1);
        assert_eq!(ids[0], ids[1] + 1);

        let second = ids[1];
        store.find_by_id_mut(second).unwrap().label = "Правка".into();
        assert_eq!(store.entries()[1].label, "Правка");
        assert_eq!(store.entries()[2].label, "Первый");
    }

    #[test]
    fn test_from_entries_caps_and_points_at_newest() {
        let entries: Vec<_> = (0..20).map(|i| entry(i, "x", "y")).collect();
        let store = HistoryStore::from_entries(entries);
        assert_eq!(store.len(), MAX_ENTRIES);
        assert_eq!(store.cursor(), Some(0));
        assert_eq!(HistoryStore::from_entries(vec![]).cursor(), None);
    }
}
