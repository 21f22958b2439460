use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::llm_client::{LlmError, ERROR_BODY_MAX_CHARS};
use crate::storage::StorageError;
use crate::vacancy::VacancyError;

/// Raw model output included with a format error is cut to this many chars.
pub const PREVIEW_MAX_CHARS: usize = 300;
/// How long the panel keeps a card-scoped error on screen.
pub const CARD_ERROR_DISMISS_MS: u64 = 3000;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A single-flight guard is held by another operation.
    #[error("Busy: {0}")]
    Busy(String),

    /// The working copy changed while a card operation was in flight.
    #[error("Stale result: {0}")]
    Stale(String),

    #[error("Model reply is not the expected JSON")]
    ResponseFormat { preview: String },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Vacancy lookup failed: {0}")]
    Vacancy(#[from] VacancyError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Failure scoped to one result card; the panel shows it on that card only.
    #[error("Card {card}: {source}")]
    Card {
        card: usize,
        #[source]
        source: Box<AppError>,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn response_format(raw: &str) -> Self {
        AppError::ResponseFormat {
            preview: raw.chars().take(PREVIEW_MAX_CHARS).collect(),
        }
    }

    pub fn for_card(card: usize, source: impl Into<AppError>) -> Self {
        match source.into() {
            already @ AppError::Card { .. } => already,
            other => AppError::Card {
                card,
                source: Box::new(other),
            },
        }
    }

    /// Status, code, user-facing message and any extra body fields.
    fn describe(&self) -> (StatusCode, &'static str, String, Map<String, Value>) {
        let mut extra = Map::new();
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Busy(msg) => (StatusCode::CONFLICT, "BUSY", msg.clone()),
            AppError::Stale(msg) => (StatusCode::CONFLICT, "STALE_RESULT", msg.clone()),
            AppError::ResponseFormat { preview } => {
                extra.insert("preview".into(), json!(preview));
                (
                    StatusCode::BAD_GATEWAY,
                    "RESPONSE_FORMAT_ERROR",
                    "Failed to parse JSON from the model response".to_string(),
                )
            }
            AppError::Llm(e) => match e {
                LlmError::Network(msg) => {
                    tracing::warn!("LLM network error: {msg}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "NETWORK_ERROR",
                        "The LLM gateway is unreachable".to_string(),
                    )
                }
                LlmError::Timeout(limit) => (
                    StatusCode::GATEWAY_TIMEOUT,
                    "TIMEOUT",
                    format!("The model did not answer within {}s", limit.as_secs()),
                ),
                LlmError::Status { status, body } => {
                    extra.insert("upstream_status".into(), json!(status));
                    extra.insert(
                        "body".into(),
                        json!(body.chars().take(ERROR_BODY_MAX_CHARS).collect::<String>()),
                    );
                    (
                        StatusCode::BAD_GATEWAY,
                        "UPSTREAM_STATUS",
                        format!("The LLM gateway returned HTTP {status}"),
                    )
                }
                LlmError::Decode(_) | LlmError::EmptyContent => {
                    extra.insert("preview".into(), json!(""));
                    (
                        StatusCode::BAD_GATEWAY,
                        "RESPONSE_FORMAT_ERROR",
                        e.to_string(),
                    )
                }
                LlmError::MissingCredential => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    "Save an API token in settings first".to_string(),
                ),
            },
            AppError::Vacancy(e) => match e {
                VacancyError::InvalidUrl(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                VacancyError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string()),
                VacancyError::Network(_) => (StatusCode::BAD_GATEWAY, "NETWORK_ERROR", e.to_string()),
                VacancyError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", e.to_string()),
                VacancyError::Status(status) => {
                    extra.insert("upstream_status".into(), json!(status));
                    (StatusCode::BAD_GATEWAY, "UPSTREAM_STATUS", e.to_string())
                }
                VacancyError::Decode(_) => {
                    (StatusCode::BAD_GATEWAY, "RESPONSE_FORMAT_ERROR", e.to_string())
                }
            },
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Card { card, source } => {
                let (status, code, message, inner) = source.describe();
                extra = inner;
                extra.insert("card".into(), json!(card));
                extra.insert("dismiss_after_ms".into(), json!(CARD_ERROR_DISMISS_MS));
                (status, code, message)
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };
        (status, code, message, extra)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, extra) = self.describe();

        let mut error = Map::new();
        error.insert("code".into(), json!(code));
        error.insert("message".into(), json!(message));
        error.extend(extra);

        (status, Json(json!({ "error": error }))).into_response()
    }
}
