/// LLM Client: the single point of entry for all model calls.
///
/// ARCHITECTURAL RULE: No other module may talk to the gateway directly.
/// Pipelines depend on the [`Completion`] trait; [`LlmClient`] is the production
/// implementation against an Anthropic-compatible Messages endpoint.
use std::future::Future;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod prompts;

const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Upstream error bodies are cut to this many chars before they reach the user.
pub const ERROR_BODY_MAX_CHARS: usize = 200;

/// Per-call budgets. Full generations and variants get the long one.
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const SHORT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unreadable gateway response: {0}")]
    Decode(String),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("No API token configured")]
    MissingCredential,
}

// ────────────────────────────────────────────────────────────────────────────
// Request / reply shapes seen by the pipelines
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    /// The single user turn.
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Option<Duration>,
    /// Overrides the client's configured key (token saved through the settings API).
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct LlmReply {
    pub text: String,
    pub model: String,
    pub usage: Usage,
}

/// Anything that turns a system prompt + user turn into model text.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<LlmReply, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Retry policy
// ────────────────────────────────────────────────────────────────────────────

/// Fixed-backoff retry for transient transport failures.
///
/// Only network failures and 5xx responses are retried. Timeouts, 4xx and
/// decode failures surface on the first occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(error: &LlmError) -> bool {
        match error {
            LlmError::Network(_) => true,
            LlmError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt().await {
                Err(e) if tries < self.max_attempts && Self::is_retryable(&e) => {
                    warn!(
                        "LLM call attempt {tries} failed ({e}), retrying after {}ms...",
                        self.backoff.as_millis()
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                other => return other,
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: String,
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

impl MessagesResponse {
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

/// The production [`Completion`]: reqwest against the configured gateway.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    gateway_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            gateway_url: config.llm_gateway_url.clone(),
            api_key: config.llm_api_key.clone(),
            retry: RetryPolicy::default(),
        })
    }

    async fn send_once(&self, request: &LlmRequest, api_key: &str) -> Result<LlmReply, LlmError> {
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(&self.gateway_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM gateway returned {status}");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_MAX_CHARS).collect(),
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;
        let text = parsed.text().ok_or(LlmError::EmptyContent)?.to_string();

        debug!(
            "LLM call succeeded: model={}, input_tokens={}, output_tokens={}",
            parsed.model, parsed.usage.input_tokens, parsed.usage.output_tokens
        );

        Ok(LlmReply {
            text,
            model: if parsed.model.is_empty() {
                request.model.clone()
            } else {
                parsed.model
            },
            usage: parsed.usage,
        })
    }
}

#[async_trait]
impl Completion for LlmClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmReply, LlmError> {
        let api_key = request
            .api_key
            .clone()
            .or_else(|| self.api_key.clone())
            .ok_or(LlmError::MissingCredential)?;

        let request = &request;
        let api_key = api_key.as_str();
        self.retry
            .run(|| async move {
                match request.timeout {
                    // Dropping the timed-out future aborts the in-flight request.
                    Some(limit) => tokio::time::timeout(limit, self.send_once(request, api_key))
                        .await
                        .unwrap_or_else(|_| Err(LlmError::Timeout(limit))),
                    None => self.send_once(request, api_key).await,
                }
            })
            .await
    }
}

/// `"<model> · <in>→<out> tok · <secs>s"`, shown under generated cards.
pub fn format_meta(reply: &LlmReply, started: Instant) -> String {
    format!(
        "{} · {}→{} tok · {:.1}s",
        reply.model,
        reply.usage.input_tokens,
        reply.usage.output_tokens,
        started.elapsed().as_secs_f64()
    )
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    static OPEN: OnceLock<Regex> = OnceLock::new();
    static CLOSE: OnceLock<Regex> = OnceLock::new();
    let open = OPEN.get_or_init(|| Regex::new(r"(?i)^```(?:json)?\s*").expect("fence open regex"));
    let close = CLOSE.get_or_init(|| Regex::new(r"\s*```\s*$").expect("fence close regex"));

    let text = text.trim();
    let start = open.find(text).map_or(0, |m| m.end());
    let text = &text[start..];
    let end = close.find(text).map_or(text.len(), |m| m.start());
    text[..end].trim()
}
