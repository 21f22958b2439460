//! Ad Text Generation: prompt → LLM → parse → sanitize.
//!
//! Flow: validate input → build structured prompt from the Platform Registry →
//!       LLM (writer system prompt) → parse `{texts}` → Sanitizer chain per record.
//!
//! Nothing here touches the workspace: callers commit the result, so a failed
//! call never leaves partial state behind.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::generation::parse::{parse_fields, parse_texts};
use crate::generation::prompts::{
    build_shorten_prompt, build_structured_prompt, build_variant_prompt, shorten_system_prompt,
    SHORTEN_MAX_TOKENS,
};
use crate::llm_client::{
    format_meta, Completion, LlmRequest, GENERATION_TIMEOUT, SHORT_TIMEOUT,
};
use crate::models::ad::{AdRecord, FieldSet};
use crate::platforms::{self, AdStyle, PlatformSpec};
use crate::sanitize::{sanitize_fields, sanitize_record};
use crate::storage::settings::Settings;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub platforms: Vec<String>,
    #[serde(default)]
    pub style: AdStyle,
    pub description: String,
}

/// Sanitized records plus the diagnostics line shown under the cards.
#[derive(Debug, Clone)]
pub struct Generation {
    pub texts: Vec<AdRecord>,
    pub meta: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Checks the input before any network call and resolves the platform ids.
pub fn validate(request: &GenerateRequest) -> Result<Vec<&'static PlatformSpec>, AppError> {
    if request.platforms.is_empty() {
        return Err(AppError::Validation("Select at least one platform".to_string()));
    }
    if request.description.trim().is_empty() {
        return Err(AppError::Validation("description cannot be empty".to_string()));
    }

    let mut specs = Vec::with_capacity(request.platforms.len());
    for id in &request.platforms {
        let spec = platforms::lookup(id)
            .ok_or_else(|| AppError::Validation(format!("Unknown platform '{id}'")))?;
        if !specs.iter().any(|s: &&PlatformSpec| s.id == spec.id) {
            specs.push(spec);
        }
    }
    Ok(specs)
}

fn llm_request(settings: &Settings, system: String, prompt: String, max_tokens: u32, timeout: Duration) -> LlmRequest {
    LlmRequest {
        system,
        prompt,
        model: settings.model.clone(),
        max_tokens,
        timeout: Some(timeout),
        api_key: settings.token.clone(),
    }
}

/// Generates one record per selected platform.
pub async fn generate(
    llm: &dyn Completion,
    settings: &Settings,
    request: &GenerateRequest,
) -> Result<Generation, AppError> {
    let specs = validate(request)?;
    let prompt = build_structured_prompt(&specs, request.style, request.description.trim());

    info!(
        "Generating ad texts for {} platform(s), style={:?}",
        specs.len(),
        request.style
    );
    let started = Instant::now();
    let reply = llm
        .complete(llm_request(
            settings,
            settings.system_prompt().to_string(),
            prompt,
            settings.max_tokens,
            GENERATION_TIMEOUT,
        ))
        .await?;
    let meta = format_meta(&reply, started);

    let mut texts = parse_texts(&reply.text)?;
    for record in &mut texts {
        sanitize_record(record);
    }
    debug!("Parsed {} record(s): {meta}", texts.len());

    Ok(Generation { texts, meta })
}

/// Asks for an alternate draft of `record`, distinct in tone and wording.
pub async fn draft_variant(
    llm: &dyn Completion,
    settings: &Settings,
    record: &AdRecord,
    style: AdStyle,
    description: &str,
) -> Result<FieldSet, AppError> {
    let spec = platforms::lookup(&record.system)
        .ok_or_else(|| AppError::Validation(format!("Unknown platform '{}'", record.system)))?;

    let reply = llm
        .complete(llm_request(
            settings,
            settings.system_prompt().to_string(),
            build_variant_prompt(spec, style, description),
            settings.max_tokens,
            GENERATION_TIMEOUT,
        ))
        .await?;

    let mut fields = parse_texts(&reply.text)?
        .into_iter()
        .next()
        .map(|r| r.fields)
        .unwrap_or_default();
    if fields.is_empty() {
        return Err(AppError::response_format(&reply.text));
    }
    // The reply's own `system` is ignored: the draft belongs to this card.
    sanitize_fields(&record.system, &mut fields);
    Ok(fields)
}

/// Rewrites the present fields of `record` under hard per-field ceilings.
/// Only fields the record already has are taken from the reply.
pub async fn shorten(llm: &dyn Completion, settings: &Settings, record: &AdRecord) -> Result<FieldSet, AppError> {
    let spec = platforms::lookup(&record.system)
        .ok_or_else(|| AppError::Validation(format!("Unknown platform '{}'", record.system)))?;

    let reply = llm
        .complete(llm_request(
            settings,
            shorten_system_prompt(),
            build_shorten_prompt(spec, &record.fields),
            SHORTEN_MAX_TOKENS,
            SHORT_TIMEOUT,
        ))
        .await?;

    let parsed = parse_fields(&reply.text)?;
    let mut fields = record.fields.clone();
    for (field, value) in parsed.present() {
        if fields.get(field).is_some() {
            fields.set(field, Some(value.to_string()));
        }
    }
    sanitize_fields(&record.system, &mut fields);
    Ok(fields)
}
