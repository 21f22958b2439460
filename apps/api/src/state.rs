use std::sync::Arc;

use crate::config::Config;
use crate::forms::FormRegistry;
use crate::llm_client::Completion;
use crate::storage::KvStore;
use crate::vacancy::HhClient;
use crate::workspace::Workspace;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable LLM transport. Default: `LlmClient` against the configured gateway.
    pub llm: Arc<dyn Completion>,
    /// Settings and history persistence (Redis, Postgres or memory).
    pub store: Arc<dyn KvStore>,
    pub workspace: Arc<Workspace>,
    pub forms: Arc<FormRegistry>,
    pub hh: HhClient,
}
