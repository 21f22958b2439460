//! Workspace: the single owner of mutable session state.
//!
//! Holds the History Store, the working copy of the entry on screen and the
//! single-flight flags. Every mutation goes through a method here, is written
//! back into the matching history entry and persisted before the method returns.
//! Manual field edits are the one exception: they are coalesced and flushed by a
//! debounced background task.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::generation::generator::{GenerateRequest, Generation};
use crate::history::HistoryStore;
use crate::models::ad::{AdField, AdRecord, FieldSet};
use crate::models::history::HistoryEntry;
use crate::platforms::{self, AdStyle, FieldGauge, GaugeLevel, Group};
use crate::storage::{keys, load, save, KvStore, StorageError};
use crate::variants::engine;

/// Deep copy of the history entry being shown and edited.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingCopy {
    pub entry_id: i64,
    pub texts: Vec<AdRecord>,
}

impl WorkingCopy {
    fn of(entry: &HistoryEntry) -> Self {
        Self {
            entry_id: entry.id,
            texts: entry.texts.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct WorkspaceState {
    history: HistoryStore,
    working: Option<WorkingCopy>,
}

impl WorkspaceState {
    /// Re-derives the working copy from the history cursor.
    fn reload_working(&mut self) {
        self.working = self.history.current().map(WorkingCopy::of);
    }

    /// Writes the working copy back into its history entry.
    fn write_back(&mut self) {
        if let Some(working) = &self.working {
            if let Some(entry) = self.history.find_by_id_mut(working.entry_id) {
                entry.texts = working.texts.clone();
            }
        }
    }

    fn card_mut(&mut self, card: usize) -> Result<&mut AdRecord, AppError> {
        self.working
            .as_mut()
            .and_then(|w| w.texts.get_mut(card))
            .ok_or_else(|| AppError::NotFound(format!("Card {card} not found")))
    }
}

#[derive(Debug, Default)]
struct BusyFlags {
    generating: bool,
    cards: HashSet<usize>,
}

/// Per-card operations that take the card's single-flight guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardOp {
    Variant,
    Shorten,
}

/// What a card operation needs to call the LLM without holding any lock.
#[derive(Debug, Clone)]
pub struct CardContext {
    pub card: usize,
    pub entry_id: i64,
    pub record: AdRecord,
    pub style: AdStyle,
    pub description: String,
}

pub struct Workspace {
    state: tokio::sync::Mutex<WorkspaceState>,
    busy: Mutex<BusyFlags>,
    store: Arc<dyn KvStore>,
    flush_tx: mpsc::UnboundedSender<()>,
}

// ────────────────────────────────────────────────────────────────────────────
// Single-flight guards
// ────────────────────────────────────────────────────────────────────────────

/// Held for the duration of a full generation.
pub struct GenerationGuard<'a> {
    workspace: &'a Workspace,
}

impl Drop for GenerationGuard<'_> {
    fn drop(&mut self) {
        self.workspace.busy_flags().generating = false;
    }
}

/// Held for the duration of one card operation.
pub struct CardGuard<'a> {
    workspace: &'a Workspace,
    card: usize,
}

impl Drop for CardGuard<'_> {
    fn drop(&mut self) {
        self.workspace.busy_flags().cards.remove(&self.card);
    }
}

impl Workspace {
    /// Restores persisted history and starts the debounced edit flusher.
    pub async fn load(store: Arc<dyn KvStore>, flush_delay: Duration) -> Result<Arc<Self>, StorageError> {
        let entries: Vec<HistoryEntry> = match load(store.as_ref(), keys::AD_HISTORY).await {
            Ok(entries) => entries.unwrap_or_default(),
            Err(StorageError::Malformed { key, source }) => {
                warn!("Discarding unreadable '{key}': {source}");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        info!("Loaded {} history entries", entries.len());

        let mut state = WorkspaceState {
            history: HistoryStore::from_entries(entries),
            working: None,
        };
        state.reload_working();

        let (flush_tx, flush_rx) = mpsc::unbounded_channel();
        let workspace = Arc::new(Self {
            state: tokio::sync::Mutex::new(state),
            busy: Mutex::new(BusyFlags::default()),
            store,
            flush_tx,
        });
        tokio::spawn(run_flusher(Arc::downgrade(&workspace), flush_rx, flush_delay));
        Ok(workspace)
    }

    fn busy_flags(&self) -> std::sync::MutexGuard<'_, BusyFlags> {
        self.busy.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switches and edits wait until a variant or shorten on the card is done.
    fn ensure_card_idle(&self, card: usize) -> Result<(), AppError> {
        if self.busy_flags().cards.contains(&card) {
            return Err(AppError::Busy(format!("Card {card} is busy")));
        }
        Ok(())
    }

    async fn persist(&self, history: &HistoryStore) -> Result<(), StorageError> {
        save(self.store.as_ref(), keys::AD_HISTORY, history.entries()).await
    }

    /// Persists the current history immediately.
    pub async fn flush(&self) -> Result<(), StorageError> {
        let state = self.state.lock().await;
        self.persist(&state.history).await
    }

    // ── Generation ──────────────────────────────────────────────────────────

    pub fn begin_generation(&self) -> Result<GenerationGuard<'_>, AppError> {
        let mut busy = self.busy_flags();
        if busy.generating {
            return Err(AppError::Busy("A generation is already running".to_string()));
        }
        busy.generating = true;
        Ok(GenerationGuard { workspace: self })
    }

    /// Wraps a successful generation in a new history entry and makes it current.
    pub async fn commit_generation(
        &self,
        request: &GenerateRequest,
        generation: Generation,
        now: DateTime<Utc>,
    ) -> Result<WorkspaceView, AppError> {
        let entry = HistoryEntry::new(
            now,
            request.style,
            request.platforms.clone(),
            request.description.trim(),
            generation.texts,
            generation.meta,
        );
        let mut state = self.state.lock().await;
        state.history.push(entry);
        state.reload_working();
        self.persist(&state.history).await?;
        Ok(WorkspaceView::of(&state))
    }

    // ── Card operations ─────────────────────────────────────────────────────

    /// Claims the card's guard and snapshots what the LLM call needs.
    pub async fn begin_card(&self, card: usize, op: CardOp) -> Result<(CardGuard<'_>, CardContext), AppError> {
        let state = self.state.lock().await;
        let working = state
            .working
            .as_ref()
            .ok_or_else(|| AppError::NotFound("No results to work on".to_string()))?;
        let record = working
            .texts
            .get(card)
            .ok_or_else(|| AppError::NotFound(format!("Card {card} not found")))?;
        if op == CardOp::Variant && !engine::can_add_variant(record) {
            return Err(AppError::Validation("This card already has the maximum number of variants".to_string()));
        }
        let entry = state.history.current();

        let mut busy = self.busy_flags();
        if op == CardOp::Variant && busy.generating {
            return Err(AppError::Busy("Wait for the running generation to finish".to_string()));
        }
        if !busy.cards.insert(card) {
            return Err(AppError::Busy(format!("Card {card} is busy")));
        }

        let context = CardContext {
            card,
            entry_id: working.entry_id,
            record: record.clone(),
            style: entry.map(|e| e.style).unwrap_or_default(),
            description: entry
                .map(|e| if e.description.is_empty() { e.label.clone() } else { e.description.clone() })
                .unwrap_or_default(),
        };
        Ok((CardGuard { workspace: self, card }, context))
    }

    /// Applies a card result if the same entry is still on screen.
    async fn commit_card<F>(&self, context: &CardContext, apply: F) -> Result<WorkspaceView, AppError>
    where
        F: FnOnce(&mut AdRecord) -> Result<(), AppError>,
    {
        let mut state = self.state.lock().await;
        if state.working.as_ref().map(|w| w.entry_id) != Some(context.entry_id) {
            debug!("Dropping result for card {}: results changed meanwhile", context.card);
            return Err(AppError::Stale(
                "Results changed while the request was running".to_string(),
            ));
        }
        apply(state.card_mut(context.card)?)?;
        state.write_back();
        self.persist(&state.history).await?;
        Ok(WorkspaceView::of(&state))
    }

    pub async fn commit_variant(&self, context: &CardContext, fields: FieldSet) -> Result<WorkspaceView, AppError> {
        self.commit_card(context, |record| {
            if engine::push_variant(record, fields) {
                Ok(())
            } else {
                Err(AppError::Validation("This card already has the maximum number of variants".to_string()))
            }
        })
        .await
    }

    pub async fn commit_shorten(&self, context: &CardContext, fields: FieldSet) -> Result<WorkspaceView, AppError> {
        self.commit_card(context, |record| {
            engine::overwrite_active(record, fields);
            Ok(())
        })
        .await
    }

    pub async fn switch_variant(
        &self,
        card: usize,
        delta: isize,
        pending: Option<&FieldSet>,
    ) -> Result<WorkspaceView, AppError> {
        let mut state = self.state.lock().await;
        self.ensure_card_idle(card)?;
        if engine::switch_variant(state.card_mut(card)?, delta, pending) {
            state.write_back();
            self.persist(&state.history).await?;
        }
        Ok(WorkspaceView::of(&state))
    }

    /// Applies manual edits in memory and schedules a debounced flush.
    pub async fn edit_fields(&self, card: usize, edits: &FieldSet) -> Result<CardView, AppError> {
        let mut state = self.state.lock().await;
        self.ensure_card_idle(card)?;
        let record = state.card_mut(card)?;
        for (field, value) in edits.present() {
            engine::apply_edit(record, field, value.to_string());
        }
        let view = CardView::of(card, record);
        state.write_back();
        drop(state);

        if self.flush_tx.send(()).is_err() {
            warn!("Edit flusher is gone; edits stay in memory until the next mutation");
        }
        Ok(view)
    }

    // ── History ─────────────────────────────────────────────────────────────

    pub async fn snapshot(&self) -> WorkspaceView {
        WorkspaceView::of(&*self.state.lock().await)
    }

    pub async fn navigate(&self, delta: isize) -> WorkspaceView {
        let mut state = self.state.lock().await;
        state.history.navigate(delta);
        state.reload_working();
        WorkspaceView::of(&state)
    }

    pub async fn rename(&self, index: usize, label: &str) -> Result<WorkspaceView, AppError> {
        let mut state = self.state.lock().await;
        if index >= state.history.len() {
            return Err(AppError::NotFound(format!("History entry {index} not found")));
        }
        if !state.history.rename(index, label) {
            return Err(AppError::Validation("label cannot be empty".to_string()));
        }
        self.persist(&state.history).await?;
        Ok(WorkspaceView::of(&state))
    }

    pub async fn delete(&self, index: usize) -> Result<WorkspaceView, AppError> {
        let mut state = self.state.lock().await;
        state
            .history
            .delete(index)
            .ok_or_else(|| AppError::NotFound(format!("History entry {index} not found")))?;
        state.reload_working();
        self.persist(&state.history).await?;
        Ok(WorkspaceView::of(&state))
    }

    pub async fn search(&self, query: &str) -> Vec<HistoryItemView> {
        let state = self.state.lock().await;
        state
            .history
            .search(query)
            .into_iter()
            .map(|(index, entry)| HistoryItemView::of(index, entry))
            .collect()
    }

    /// Record on screen at `card`, for the Form-Fill Bridge.
    pub async fn card(&self, card: usize) -> Result<AdRecord, AppError> {
        let state = self.state.lock().await;
        state
            .working
            .as_ref()
            .and_then(|w| w.texts.get(card))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Card {card} not found")))
    }
}

/// Trailing-edge debounce: flushes once no edit arrived for `delay`.
async fn run_flusher(workspace: Weak<Workspace>, mut rx: mpsc::UnboundedReceiver<()>, delay: Duration) {
    while rx.recv().await.is_some() {
        loop {
            tokio::select! {
                more = rx.recv() => {
                    if more.is_none() {
                        break;
                    }
                }
                _ = tokio::time::sleep(delay) => break,
            }
        }
        let Some(workspace) = workspace.upgrade() else {
            return;
        };
        match workspace.flush().await {
            Ok(()) => debug!("Flushed coalesced edits"),
            Err(e) => warn!("Failed to flush edits: {e}"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Views returned to the panel
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub index: usize,
    #[serde(flatten)]
    pub record: AdRecord,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
    pub gauges: Vec<FieldGauge>,
    pub over_limit: bool,
    pub variant_count: usize,
    pub variant_index: usize,
    pub can_add_variant: bool,
}

impl CardView {
    pub fn of(index: usize, record: &AdRecord) -> Self {
        let spec = platforms::lookup(&record.system);
        let gauges: Vec<FieldGauge> = spec
            .map(|spec| {
                record
                    .fields
                    .present()
                    .filter_map(|(field, value)| {
                        spec.limit(field).map(|limit| FieldGauge::measure(field, value, limit))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            index,
            record: record.clone(),
            label: spec.map_or_else(|| record.system.clone(), |s| s.label.to_string()),
            group: spec.map(|s| s.group),
            over_limit: gauges.iter().any(|g| g.level == GaugeLevel::Over),
            gauges,
            variant_count: engine::variant_count(record),
            variant_index: record.variants.as_ref().map_or(0, |v| v.cursor()),
            can_add_variant: engine::can_add_variant(record),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryItemView {
    pub index: usize,
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub style: AdStyle,
    pub platforms: Vec<String>,
    pub meta: String,
    pub record_count: usize,
}

impl HistoryItemView {
    fn of(index: usize, entry: &HistoryEntry) -> Self {
        Self {
            index,
            id: entry.id,
            timestamp: entry.timestamp,
            label: entry.label.clone(),
            style: entry.style,
            platforms: entry.platforms.clone(),
            meta: entry.meta.clone(),
            record_count: entry.texts.len(),
        }
    }
}

/// Everything the panel renders: the cards on screen and the history position.
/// `entry` is `None` in the empty state.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceView {
    pub entry: Option<HistoryItemView>,
    pub history_index: Option<usize>,
    pub history_len: usize,
    pub cards: Vec<CardView>,
}

impl WorkspaceView {
    fn of(state: &WorkspaceState) -> Self {
        let entry = state
            .history
            .cursor()
            .zip(state.history.current())
            .map(|(index, entry)| HistoryItemView::of(index, entry));
        let cards = state
            .working
            .as_ref()
            .map(|w| w.texts.iter().enumerate().map(|(i, r)| CardView::of(i, r)).collect())
            .unwrap_or_default();
        Self {
            entry,
            history_index: state.history.cursor(),
            history_len: state.history.len(),
            cards,
        }
    }
}
