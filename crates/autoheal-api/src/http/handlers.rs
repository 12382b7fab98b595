//! Control endpoint handlers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use autoheal_engine::{ElementInfo, RunStatus, list_current_elements, load_instructions};
use autoheal_protocols::StepRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Request to start a run.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    /// Path of a JSON or YAML instruction file on the server.
    pub source: PathBuf,
}

/// Response to an accepted run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStarted {
    pub status: &'static str,
    pub source: String,
    pub total_steps: usize,
}

/// Run progress plus the tail of the log.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub current_step: usize,
    pub total_steps: usize,
    pub running: bool,
    pub paused: bool,
    pub stopped: bool,
    pub recent_log_lines: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// POST /run
pub async fn start_run(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if state.is_run_active() {
        return Err(ApiError::RunActive);
    }
    let steps = load_instructions(&request.source)?;
    let total_steps = state.start_run(steps)?;
    info!(
        "Run accepted: {} ({} steps)",
        request.source.display(),
        total_steps
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(RunStarted {
            status: "started",
            source: request.source.display().to_string(),
            total_steps,
        }),
    ))
}

/// POST /pause
pub async fn pause(State(state): State<Arc<AppState>>) -> Json<RunStatus> {
    state.control.pause();
    info!("Pause requested");
    Json(state.control.status())
}

/// POST /resume
pub async fn resume(State(state): State<Arc<AppState>>) -> Json<RunStatus> {
    state.control.resume();
    info!("Resume requested");
    Json(state.control.status())
}

/// POST /stop
pub async fn stop(State(state): State<Arc<AppState>>) -> Json<RunStatus> {
    state.control.stop();
    info!("Stop requested");
    Json(state.control.status())
}

/// GET /status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let status = state.control.status();
    Json(StatusResponse {
        current_step: status.current_step,
        total_steps: status.total_steps,
        running: status.running,
        paused: status.paused,
        stopped: status.stopped,
        recent_log_lines: state.logs.lines(),
    })
}

/// GET /elements
pub async fn elements(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ElementInfo>>, ApiError> {
    let elements = list_current_elements(state.driver.as_ref(), &state.config.resolution).await?;
    Ok(Json(elements))
}

/// GET /results
pub async fn results(State(state): State<Arc<AppState>>) -> Json<Vec<StepRecord>> {
    Json(state.results.snapshot())
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime().as_secs(),
    })
}
