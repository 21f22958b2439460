//! Axum route handlers for the Generation API.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::generation::generator::{generate, validate, GenerateRequest};
use crate::platforms::{self, AdStyle, PlatformSpec};
use crate::state::AppState;
use crate::storage::settings::{Settings, SettingsUpdate};
use crate::workspace::WorkspaceView;

#[derive(Debug, Serialize)]
pub struct StyleOption {
    pub id: AdStyle,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PlatformsResponse {
    pub platforms: &'static [PlatformSpec],
    pub styles: Vec<StyleOption>,
}

/// GET /api/v1/platforms
pub async fn handle_list_platforms() -> Json<PlatformsResponse> {
    let styles = [AdStyle::Creative, AdStyle::Balanced, AdStyle::Formal]
        .into_iter()
        .map(|id| StyleOption { id, label: id.label() })
        .collect();
    Json(PlatformsResponse {
        platforms: platforms::all(),
        styles,
    })
}

/// POST /api/v1/generate
///
/// Runs one full generation and makes it the current history entry.
/// Refused with BUSY while another generation is in flight.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<WorkspaceView>, AppError> {
    validate(&request)?;
    let _guard = state.workspace.begin_generation()?;

    // The panel restores its selection from these on the next open.
    SettingsUpdate {
        platforms: Some(request.platforms.clone()),
        style: Some(request.style),
        description: Some(request.description.clone()),
        ..Default::default()
    }
    .apply(state.store.as_ref())
    .await?;

    let settings = Settings::load(state.store.as_ref(), &state.config).await?;
    let generation = generate(state.llm.as_ref(), &settings, &request).await?;
    info!("Generated {} record(s): {}", generation.texts.len(), generation.meta);

    let view = state
        .workspace
        .commit_generation(&request, generation, Utc::now())
        .await?;
    Ok(Json(view))
}

/// GET /api/v1/results
pub async fn handle_get_results(State(state): State<AppState>) -> Json<WorkspaceView> {
    Json(state.workspace.snapshot().await)
}
