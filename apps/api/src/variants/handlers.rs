//! Axum route handlers for per-card operations.
//!
//! Every failure here is wrapped with its card index so the panel shows it on
//! that card only.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::generation::generator::{draft_variant, shorten};
use crate::models::ad::FieldSet;
use crate::state::AppState;
use crate::storage::settings::Settings;
use crate::workspace::{CardOp, CardView, WorkspaceView};

#[derive(Debug, Deserialize)]
pub struct SwitchRequest {
    pub delta: isize,
    /// Unsaved edits from the panel, written into the current draft before moving.
    #[serde(default)]
    pub pending: Option<FieldSet>,
}

async fn run_variant(state: &AppState, card: usize) -> Result<WorkspaceView, AppError> {
    let (_guard, ctx) = state.workspace.begin_card(card, CardOp::Variant).await?;
    let settings = Settings::load(state.store.as_ref(), &state.config).await?;
    let fields = draft_variant(state.llm.as_ref(), &settings, &ctx.record, ctx.style, &ctx.description).await?;
    info!("New variant for card {card} ({})", ctx.record.system);
    state.workspace.commit_variant(&ctx, fields).await
}

async fn run_shorten(state: &AppState, card: usize) -> Result<WorkspaceView, AppError> {
    let (_guard, ctx) = state.workspace.begin_card(card, CardOp::Shorten).await?;
    let settings = Settings::load(state.store.as_ref(), &state.config).await?;
    let fields = shorten(state.llm.as_ref(), &settings, &ctx.record).await?;
    info!("Shortened card {card} ({})", ctx.record.system);
    state.workspace.commit_shorten(&ctx, fields).await
}

/// POST /api/v1/cards/:card/variants
pub async fn handle_generate_variant(
    State(state): State<AppState>,
    Path(card): Path<usize>,
) -> Result<Json<WorkspaceView>, AppError> {
    run_variant(&state, card)
        .await
        .map(Json)
        .map_err(|e| AppError::for_card(card, e))
}

/// POST /api/v1/cards/:card/shorten
pub async fn handle_shorten(
    State(state): State<AppState>,
    Path(card): Path<usize>,
) -> Result<Json<WorkspaceView>, AppError> {
    run_shorten(&state, card)
        .await
        .map(Json)
        .map_err(|e| AppError::for_card(card, e))
}

/// POST /api/v1/cards/:card/switch
pub async fn handle_switch_variant(
    State(state): State<AppState>,
    Path(card): Path<usize>,
    Json(request): Json<SwitchRequest>,
) -> Result<Json<WorkspaceView>, AppError> {
    state
        .workspace
        .switch_variant(card, request.delta, request.pending.as_ref())
        .await
        .map(Json)
        .map_err(|e| AppError::for_card(card, e))
}

/// PATCH /api/v1/cards/:card/fields
///
/// Body is a partial field set; only the fields present are overwritten.
pub async fn handle_edit_fields(
    State(state): State<AppState>,
    Path(card): Path<usize>,
    Json(edits): Json<FieldSet>,
) -> Result<Json<CardView>, AppError> {
    if edits.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }
    state
        .workspace
        .edit_fields(card, &edits)
        .await
        .map(Json)
        .map_err(|e| AppError::for_card(card, e))
}
