mod config;
mod errors;
mod forms;
mod generation;
mod history;
mod llm_client;
mod models;
mod platforms;
mod routes;
mod sanitize;
mod state;
mod storage;
mod vacancy;
mod variants;
mod workspace;

use anyhow::Result;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::forms::FormRegistry;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::vacancy::HhClient;
use crate::workspace::Workspace;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails only on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME").replace('-', "_"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting textgen API v{}", env!("CARGO_PKG_VERSION"));

    // Persisted state: Redis, Postgres or memory
    let store = storage::connect(&config).await?;

    // Initialize LLM client
    let llm = LlmClient::new(&config)?;
    info!("LLM client initialized (default model: {})", config.llm_model);

    let hh = HhClient::new(&config)?;

    let forms = FormRegistry::load(&config)?;
    info!("Form-fill registry: {} target(s)", forms.targets().len());

    // Restore history and start the edit flusher
    let workspace = Workspace::load(store.clone(), config.edit_flush_delay).await?;

    // Build app state
    let state = AppState {
        config: config.clone(),
        llm: Arc::new(llm),
        store,
        workspace: workspace.clone(),
        forms: Arc::new(forms),
        hh,
    };

    // Build router; the extension's side panel calls from its own origin
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Coalesced edits still waiting for the debounce window
    if let Err(e) = workspace.flush().await {
        warn!("Final history flush failed: {e}");
    }
    info!("Shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
