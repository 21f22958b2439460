use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_GATEWAY_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_HH_API_URL: &str = "https://api.hh.ru";

/// Application configuration loaded from environment variables.
/// Only malformed values are fatal; everything else has a default.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub llm_gateway_url: String,
    /// Fallback credential. A token saved through the settings API wins.
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_max_tokens: u32,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    /// JSON file replacing the built-in form-fill registry.
    pub form_targets_path: Option<PathBuf>,
    /// Debounce window for coalescing manual field edits before they hit storage.
    pub edit_flush_delay: Duration,
    pub hh_api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm_gateway_url: std::env::var("LLM_GATEWAY_URL")
                .unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string()),
            llm_api_key: optional_env("LLM_API_KEY"),
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            llm_max_tokens: parse_env("LLM_MAX_TOKENS", 4096)?,
            database_url: optional_env("DATABASE_URL"),
            redis_url: optional_env("REDIS_URL"),
            form_targets_path: optional_env("FORM_TARGETS_PATH").map(PathBuf::from),
            edit_flush_delay: Duration::from_millis(parse_env("EDIT_FLUSH_MS", 500)?),
            hh_api_url: std::env::var("HH_API_URL")
                .unwrap_or_else(|_| DEFAULT_HH_API_URL.to_string()),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Defaults without touching the process environment.
    pub fn for_tests() -> Self {
        Config {
            port: 0,
            rust_log: "debug".to_string(),
            llm_gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            llm_api_key: Some("test-key".to_string()),
            llm_model: DEFAULT_MODEL.to_string(),
            llm_max_tokens: 4096,
            database_url: None,
            redis_url: None,
            form_targets_path: None,
            edit_flush_delay: Duration::from_millis(500),
            hh_api_url: DEFAULT_HH_API_URL.to_string(),
        }
    }
}
