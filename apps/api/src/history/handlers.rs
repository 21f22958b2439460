//! Axum route handlers for the History API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;
use crate::workspace::{HistoryItemView, WorkspaceView};

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryListResponse {
    pub entries: Vec<HistoryItemView>,
    pub cursor: Option<usize>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub delta: isize,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub label: String,
}

/// GET /api/v1/history?q=
///
/// Without `q` every entry is listed; indices always refer to the full list.
pub async fn handle_list_history(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<HistoryListResponse> {
    let entries = state.workspace.search(&query.q).await;
    let snapshot = state.workspace.snapshot().await;
    Json(HistoryListResponse {
        entries,
        cursor: snapshot.history_index,
        total: snapshot.history_len,
    })
}

/// POST /api/v1/history/navigate
pub async fn handle_navigate(
    State(state): State<AppState>,
    Json(request): Json<NavigateRequest>,
) -> Json<WorkspaceView> {
    Json(state.workspace.navigate(request.delta).await)
}

/// PATCH /api/v1/history/:index
pub async fn handle_rename(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<WorkspaceView>, AppError> {
    Ok(Json(state.workspace.rename(index, &request.label).await?))
}

/// DELETE /api/v1/history/:index
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<WorkspaceView>, AppError> {
    Ok(Json(state.workspace.delete(index).await?))
}
