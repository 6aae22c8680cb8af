pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::cadence::handlers as cadence;
use crate::state::AppState;

/// Request body ceiling. A 4 MiB image grows to ~5.4 MiB as base64.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis API
        .route(
            "/api/v1/analysis/:feature",
            post(analysis::handle_run_analysis),
        )
        .route(
            "/api/v1/content-compass/options",
            get(analysis::handle_compass_options),
        )
        // Gentle Cadence
        .route("/api/v1/cadence", get(cadence::handle_cadence))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
