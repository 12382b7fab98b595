//! HTTP route definitions.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Create the control router.
///
/// ```text
/// POST /run       - Start a run from an instruction file ({"source": "<path>"})
/// POST /pause     - Hold the run at its next checkpoint
/// POST /resume    - Release a paused run
/// POST /stop      - Stop the run; remaining steps are marked STOPPED
/// GET  /status    - Progress and recent log lines
/// GET  /elements  - Actionable elements of the focused window
/// GET  /results   - Records of the current or last run
/// GET  /health    - Liveness
/// ```
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/run", post(handlers::start_run))
        .route("/pause", post(handlers::pause))
        .route("/resume", post(handlers::resume))
        .route("/stop", post(handlers::stop))
        .route("/status", get(handlers::status))
        .route("/elements", get(handlers::elements))
        .route("/results", get(handlers::results))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
