//! Variant Engine: per-record state machine over 1..=4 alternative drafts.
//!
//! The live fields of an [`AdRecord`] always mirror `variants[vi]` once a
//! [`VariantSet`] exists, and every edit lands in both places.

use crate::models::ad::{AdField, AdRecord, FieldSet, VariantSet};

impl VariantSet {
    pub const MAX_VARIANTS: usize = 4;

    fn seeded(fields: &FieldSet) -> Self {
        Self {
            entries: vec![fields.clone()],
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entries(&self) -> &[FieldSet] {
        &self.entries
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= Self::MAX_VARIANTS
    }

    fn active_mut(&mut self) -> Option<&mut FieldSet> {
        self.entries.get_mut(self.cursor)
    }
}

/// Number of drafts a record carries; a record without a set has one.
pub fn variant_count(record: &AdRecord) -> usize {
    record.variants.as_ref().map_or(1, |v| v.len().max(1))
}

pub fn can_add_variant(record: &AdRecord) -> bool {
    !record.variants.as_ref().is_some_and(VariantSet::is_full)
}

/// Preserves the original draft as `variants[0]` before the first alternate exists.
pub fn seed_variants(record: &mut AdRecord) {
    if record.variants.as_ref().map_or(true, VariantSet::is_empty) {
        record.variants = Some(VariantSet::seeded(&record.fields));
    }
}

/// Appends a new draft, makes it current and copies it onto the live fields.
/// At the cap nothing changes and `false` is returned.
pub fn push_variant(record: &mut AdRecord, fields: FieldSet) -> bool {
    seed_variants(record);
    let Some(set) = record.variants.as_mut() else {
        return false;
    };
    if set.is_full() {
        return false;
    }
    set.entries.push(fields.clone());
    set.cursor = set.entries.len() - 1;
    record.fields = fields;
    true
}

/// Moves the cursor by `delta`. `pending` edits from the panel are written into
/// the current slot first so navigation never drops them.
///
/// No-op (returns false) with fewer than two drafts or when the target is out of range.
pub fn switch_variant(record: &mut AdRecord, delta: isize, pending: Option<&FieldSet>) -> bool {
    let Some(set) = record.variants.as_mut() else {
        return false;
    };
    if set.len() < 2 {
        return false;
    }
    let Some(target) = set
        .cursor
        .checked_add_signed(delta)
        .filter(|&t| t < set.len())
    else {
        return false;
    };

    if let Some(edits) = pending {
        record.fields.merge_from(edits);
    }
    if let Some(active) = set.active_mut() {
        *active = record.fields.clone();
    }
    set.cursor = target;
    record.fields = set.entries[target].clone();
    true
}

/// Manual edit of one field, mirrored into the active draft.
pub fn apply_edit(record: &mut AdRecord, field: AdField, value: String) {
    if let Some(active) = record.variants.as_mut().and_then(VariantSet::active_mut) {
        active.set(field, Some(value.clone()));
    }
    record.fields.set(field, Some(value));
}

/// Replaces the live fields in place (shortening); the active draft follows
/// without a new variant being created.
pub fn overwrite_active(record: &mut AdRecord, fields: FieldSet) {
    if let Some(active) = record.variants.as_mut().and_then(VariantSet::active_mut) {
        *active = fields.clone();
    }
    record.fields = fields;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(headline: &str, text: &str) -> FieldSet {
        FieldSet {
            headline: Some(headline.to_string()),
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn record() -> AdRecord {
        AdRecord::new("vk_site", fields("Оригинал", "Исходный текст"))
    }

    #[test]
    fn test_first_push_seeds_original_draft() {
        let mut r = record();
        assert!(push_variant(&mut r, fields("Второй", "Другой текст")));
        let set = r.variants.as_ref().unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.cursor(), 1);
        assert_eq!(set.entries()[0].headline.as_deref(), Some("Оригинал"));
        assert_eq!(r.fields.headline.as_deref(), Some("Второй"));
    }

    #[test]
    fn test_fifth_variant_is_refused_and_state_unchanged() {
        let mut r = record();
        for i in 0..3 {
            assert!(push_variant(&mut r, fields(&format!("V{i}"), "t")));
        }
        assert!(!can_add_variant(&r));
        let before = r.clone();
        assert!(!push_variant(&mut r, fields("V5", "t")));
        assert_eq!(r, before);
        assert_eq!(variant_count(&r), VariantSet::MAX_VARIANTS);
    }

    #[test]
    fn test_switch_is_noop_without_alternates() {
        let mut r = record();
        assert!(!switch_variant(&mut r, 1, None));
        seed_variants(&mut r);
        assert!(!switch_variant(&mut r, 1, None));
        assert_eq!(r.variants.as_ref().unwrap().cursor(), 0);
    }

    #[test]
    fn test_switch_out_of_bounds_is_noop() {
        let mut r = record();
        push_variant(&mut r, fields("Второй", "t"));
        assert!(!switch_variant(&mut r, 1, None));
        assert!(!switch_variant(&mut r, -2, None));
        assert_eq!(r.variants.as_ref().unwrap().cursor(), 1);
    }

    #[test]
    fn test_switch_mirrors_target_and_keeps_count() {
        let mut r = record();
        push_variant(&mut r, fields("Второй", "t2"));
        push_variant(&mut r, fields("Третий", "t3"));
        assert!(switch_variant(&mut r, -2, None));
        assert_eq!(r.fields.headline.as_deref(), Some("Оригинал"));
        assert_eq!(variant_count(&r), 3);
        let set = r.variants.as_ref().unwrap();
        assert_eq!(set.entries()[set.cursor()], r.fields);
    }

    #[test]
    fn test_pending_edits_survive_switching_away_and_back() {
        let mut r = record();
        push_variant(&mut r, fields("Второй", "t2"));
        let pending = FieldSet {
            text: Some("Правка пользователя".into()),
            ..Default::default()
        };
        switch_variant(&mut r, -1, Some(&pending));
        switch_variant(&mut r, 1, None);
        assert_eq!(r.fields.text.as_deref(), Some("Правка пользователя"));
        assert_eq!(r.fields.headline.as_deref(), Some("Второй"));
    }

    #[test]
    fn test_apply_edit_writes_live_and_active_variant() {
        let mut r = record();
        push_variant(&mut r, fields("Второй", "t2"));
        apply_edit(&mut r, AdField::Headline, "Исправлено".into());
        switch_variant(&mut r, -1, None);
        switch_variant(&mut r, 1, None);
        assert_eq!(r.fields.headline.as_deref(), Some("Исправлено"));
    }

    #[test]
    fn test_apply_edit_without_variants_only_touches_live() {
        let mut r = record();
        apply_edit(&mut r, AdField::Text, "Новый".into());
        assert_eq!(r.fields.text.as_deref(), Some("Новый"));
        assert!(r.variants.is_none());
    }

    #[test]
    fn test_overwrite_active_does_not_add_variant() {
        let mut r = record();
        push_variant(&mut r, fields("Второй", "Очень длинный текст"));
        overwrite_active(&mut r, fields("Второй", "Короче"));
        let set = r.variants.as_ref().unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.entries()[1].text.as_deref(), Some("Короче"));
        assert_eq!(set.entries()[0].text.as_deref(), Some("Исходный текст"));
    }
}
