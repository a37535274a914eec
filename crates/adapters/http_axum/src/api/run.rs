//! JSON handlers for the manual run console, plus the runner view shared
//! with the schedule endpoints.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use scripthub_app::ports::{DeviceCatalog, ScheduleStore, ScriptCatalog};
use scripthub_app::script_runner::{RunState, ScriptRunner};
use scripthub_domain::time::Timestamp;

use crate::error::ApiError;
use crate::state::AppState;

/// Status and captured output of one script execution.
#[derive(Debug, Serialize)]
pub struct RunnerView {
    pub script: String,
    /// `running`, `finished` or `launch_failed`.
    pub state: &'static str,
    pub alive: bool,
    pub exit_code: Option<i32>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    /// Lines after the requested offset.
    pub output: Vec<String>,
    /// Offset to ask for next to receive only new lines.
    pub next_offset: usize,
}

impl RunnerView {
    /// Snapshot `runner`, keeping only output lines after `since`.
    ///
    /// An offset past the end yields no lines and a `next_offset` pointing at
    /// the current end.
    #[must_use]
    pub fn new(runner: &ScriptRunner, since: usize) -> Self {
        let state = runner.state();
        let output = runner.output_since(since);
        let next_offset = if output.is_empty() {
            runner.output_len().min(since)
        } else {
            since + output.len()
        };
        Self {
            script: runner.script().to_string(),
            state: state.as_str(),
            alive: state == RunState::Running,
            exit_code: match state {
                RunState::Finished(code) => Some(code),
                RunState::Running | RunState::LaunchFailed => None,
            },
            started_at: runner.started_at(),
            finished_at: runner.finished_at(),
            output,
            next_offset,
        }
    }
}

/// `?since=` query of the runner endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct OutputQuery {
    #[serde(default)]
    pub since: usize,
}

/// Request body for starting a manual run.
#[derive(Deserialize)]
pub struct StartRequest {
    pub script: String,
}

/// Result of an abort request.
#[derive(Debug, Serialize)]
pub struct AbortView {
    /// Whether the script was gone when the bounded wait ended.
    pub terminated: bool,
}

/// Possible responses from the status endpoint.
pub enum StatusResponse {
    Ok(Json<RunnerView>),
    /// Nothing was ever started.
    NoContent,
}

impl IntoResponse for StatusResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// Possible responses from the start endpoint.
pub enum StartResponse {
    Accepted(Json<RunnerView>),
}

impl IntoResponse for StartResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Accepted(json) => (StatusCode::ACCEPTED, json).into_response(),
        }
    }
}

/// Possible responses from the abort endpoints.
pub enum AbortResponse {
    Ok(Json<AbortView>),
}

impl IntoResponse for AbortResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/run?since=n` — status of the latest manual run.
pub async fn status<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Query(query): Query<OutputQuery>,
) -> StatusResponse
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    match state.manual_run.current() {
        Some(runner) => StatusResponse::Ok(Json(RunnerView::new(&runner, query.since))),
        None => StatusResponse::NoContent,
    }
}

/// `POST /api/run` — start a script unless another manual run is alive.
pub async fn start<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Json(req): Json<StartRequest>,
) -> Result<StartResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let runner = state.manual_run.run(&req.script).await?;
    Ok(StartResponse::Accepted(Json(RunnerView::new(&runner, 0))))
}

/// `POST /api/run/abort` — abort the manual run.
pub async fn abort<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
) -> Result<AbortResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let terminated = state.manual_run.abort().await?;
    Ok(AbortResponse::Ok(Json(AbortView { terminated })))
}
