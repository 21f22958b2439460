pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::forms::handlers as forms;
use crate::generation::handlers as generation;
use crate::history::handlers as history;
use crate::state::AppState;
use crate::storage::handlers as settings;
use crate::variants::handlers as cards;
use crate::vacancy;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Registry and settings
        .route("/api/v1/platforms", get(generation::handle_list_platforms))
        .route(
            "/api/v1/settings",
            get(settings::handle_get_settings).put(settings::handle_put_settings),
        )
        // Generation and the working copy
        .route("/api/v1/generate", post(generation::handle_generate))
        .route("/api/v1/results", get(generation::handle_get_results))
        .route(
            "/api/v1/cards/:card/variants",
            post(cards::handle_generate_variant),
        )
        .route("/api/v1/cards/:card/switch", post(cards::handle_switch_variant))
        .route("/api/v1/cards/:card/shorten", post(cards::handle_shorten))
        .route("/api/v1/cards/:card/fields", patch(cards::handle_edit_fields))
        // History
        .route("/api/v1/history", get(history::handle_list_history))
        .route("/api/v1/history/navigate", post(history::handle_navigate))
        .route(
            "/api/v1/history/:index",
            patch(history::handle_rename).delete(history::handle_delete),
        )
        // Form-fill bridge
        .route("/api/v1/forms/detect", post(forms::handle_detect))
        .route("/api/v1/forms/fill", post(forms::handle_fill))
        .route("/api/v1/forms/clear", post(forms::handle_clear))
        .route("/api/v1/forms/report", post(forms::handle_report))
        // HH import
        .route("/api/v1/vacancy/import", post(vacancy::handle_import))
        .with_state(state)
}
