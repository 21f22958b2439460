//! Axum route handlers for the Settings API.

use axum::{extract::State, Json};
use tracing::info;

use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::settings::{Settings, SettingsUpdate, SettingsView};

/// GET /api/v1/settings
pub async fn handle_get_settings(State(state): State<AppState>) -> Result<Json<SettingsView>, AppError> {
    let settings = Settings::load(state.store.as_ref(), &state.config).await?;
    Ok(Json(settings.view()))
}

/// PUT /api/v1/settings
///
/// Partial update; returns the settings as they read after the write.
pub async fn handle_put_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<SettingsView>, AppError> {
    if update.max_tokens == Some(0) {
        return Err(AppError::Validation("max_tokens must be positive".to_string()));
    }
    update.apply(state.store.as_ref()).await?;
    info!("Settings updated");

    let settings = Settings::load(state.store.as_ref(), &state.config).await?;
    Ok(Json(settings.view()))
}
