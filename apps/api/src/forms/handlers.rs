//! Axum route handlers for the Form-Fill API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::bridge::{self, FieldResult, FillReport, FormAction};
use super::script::InjectionScript;
use super::FormTarget;
use crate::errors::AppError;
use crate::models::ad::AdField;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub target: Option<FormTarget>,
    /// Cards on screen whose platform the detected form accepts.
    pub cards: Vec<usize>,
}

#[derive(Debug, Deserialize)]
pub struct FillRequest {
    pub target: String,
    pub card: usize,
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct ScriptResponse {
    pub action: FormAction,
    pub target: String,
    pub fields: Vec<AdField>,
    /// Program for `chrome.scripting.executeScript`; its result goes to `/forms/report`.
    pub script: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub action: FormAction,
    #[serde(default)]
    pub results: Vec<FieldResult>,
}

fn lookup_target<'a>(state: &'a AppState, id: &str) -> Result<&'a FormTarget, AppError> {
    state
        .forms
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("Form target '{id}' not found")))
}

fn render(script: &InjectionScript, action: FormAction, target: &FormTarget) -> Result<ScriptResponse, AppError> {
    Ok(ScriptResponse {
        action,
        target: target.id.clone(),
        fields: script.fields(),
        script: script.render().map_err(anyhow::Error::from)?,
    })
}

/// POST /api/v1/forms/detect
pub async fn handle_detect(
    State(state): State<AppState>,
    Json(request): Json<DetectRequest>,
) -> Json<DetectResponse> {
    let Some(target) = state.forms.detect(&request.url) else {
        return Json(DetectResponse {
            target: None,
            cards: Vec::new(),
        });
    };
    let cards = state
        .workspace
        .snapshot()
        .await
        .cards
        .iter()
        .filter(|c| target.accepts_platform(&c.record.system))
        .map(|c| c.index)
        .collect();
    Json(DetectResponse {
        target: Some(target.clone()),
        cards,
    })
}

/// POST /api/v1/forms/fill
pub async fn handle_fill(
    State(state): State<AppState>,
    Json(request): Json<FillRequest>,
) -> Result<Json<ScriptResponse>, AppError> {
    let target = lookup_target(&state, &request.target)?;
    let record = state.workspace.card(request.card).await?;
    if !target.accepts_platform(&record.system) {
        return Err(AppError::Validation(format!(
            "{} does not accept {} texts",
            target.label, record.system
        )));
    }

    let mut script = InjectionScript::new(FormAction::Fill);
    bridge::fill(&mut script, &record, target).await;
    info!("Fill script for card {} into {}: {} field(s)", request.card, target.id, script.fields().len());
    Ok(Json(render(&script, FormAction::Fill, target)?))
}

/// POST /api/v1/forms/clear
pub async fn handle_clear(
    State(state): State<AppState>,
    Json(request): Json<ClearRequest>,
) -> Result<Json<ScriptResponse>, AppError> {
    let target = lookup_target(&state, &request.target)?;
    let mut script = InjectionScript::new(FormAction::Clear);
    bridge::clear(&mut script, target).await;
    Ok(Json(render(&script, FormAction::Clear, target)?))
}

/// POST /api/v1/forms/report
///
/// Turns the executed script's per-field results into the final outcome.
pub async fn handle_report(Json(request): Json<ReportRequest>) -> Json<FillReport> {
    let report = FillReport::from_results(request.action, request.results);
    info!("Form {:?}: {}", request.action, report.message);
    Json(report)
}
