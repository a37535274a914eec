//! JSON handlers for schedules and their runners.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use scripthub_app::ports::{DeviceCatalog, ScheduleStore, ScriptCatalog};
use scripthub_app::scheduler::ScheduleEntry;
use scripthub_domain::device::Catalog;
use scripthub_domain::error::{ConflictError, NotFoundError, ScriptHubError};
use scripthub_domain::id::{ConditionId, ScheduleId};
use scripthub_domain::schedule::{Condition, ConditionRecord, Schedule};
use scripthub_domain::time::Timestamp;

use crate::api::run::{AbortResponse, AbortView, OutputQuery, RunnerView};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating or replacing a schedule.
///
/// Conditions use the persisted shape: `type_name` plus the variant fields.
#[derive(Deserialize)]
pub struct ScheduleRequest {
    pub name: String,
    pub script: String,
    #[serde(default)]
    pub keep_running: bool,
    #[serde(default)]
    pub conditions: Vec<ConditionRecord>,
}

/// A condition as shown to clients.
#[derive(Debug, Serialize)]
pub struct ConditionView {
    pub id: ConditionId,
    #[serde(flatten)]
    pub record: ConditionRecord,
    pub type_title: &'static str,
    pub description: String,
}

/// A schedule as shown to clients.
#[derive(Debug, Serialize)]
pub struct ScheduleView {
    pub id: ScheduleId,
    pub name: String,
    pub script: String,
    pub keep_running: bool,
    pub running: bool,
    pub last_triggered: Option<Timestamp>,
    pub conditions: Vec<ConditionView>,
}

impl ScheduleView {
    fn new(id: ScheduleId, entry: &ScheduleEntry) -> Self {
        let schedule = &entry.schedule;
        Self {
            id,
            name: schedule.name.clone(),
            script: schedule.script.clone(),
            keep_running: schedule.keep_running,
            running: entry.is_running(),
            last_triggered: schedule.last_triggered,
            conditions: schedule
                .conditions()
                .map(|(id, condition)| ConditionView {
                    id,
                    record: condition.to_record(),
                    type_title: condition.type_title(),
                    description: condition.to_string(),
                })
                .collect(),
        }
    }
}

/// Result of a manual trigger.
#[derive(Debug, Serialize)]
pub struct RunView {
    /// `false` when the previous run was still alive.
    pub launched: bool,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<ScheduleView>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get and replace endpoints.
pub enum GetResponse {
    Ok(Json<ScheduleView>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<ScheduleView>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// Possible responses from the run endpoint.
pub enum RunResponse {
    Ok(Json<RunView>),
}

impl IntoResponse for RunResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the runner endpoint.
pub enum RunnerResponse {
    Ok(Json<RunnerView>),
}

impl IntoResponse for RunnerResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

fn schedule_not_found(id: impl ToString) -> NotFoundError {
    NotFoundError {
        entity: "Schedule",
        id: id.to_string(),
    }
}

/// A malformed id cannot name an existing schedule.
fn parse_id(raw: &str) -> Result<ScheduleId, ApiError> {
    ScheduleId::from_str(raw).map_err(|_| schedule_not_found(raw).into())
}

fn build_schedule(
    id: Option<ScheduleId>,
    req: ScheduleRequest,
    catalog: &Catalog,
) -> Result<Schedule, ApiError> {
    let mut builder = Schedule::builder()
        .name(req.name)
        .script(req.script)
        .keep_running(req.keep_running);
    if let Some(id) = id {
        builder = builder.id(id);
    }
    for record in &req.conditions {
        builder = builder.condition(Condition::from_input(record, catalog)?);
    }
    Ok(builder.build()?)
}

fn view_of<SS, SC, DC>(
    state: &AppState<SS, SC, DC>,
    id: ScheduleId,
) -> Result<ScheduleView, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let entry = state
        .scheduler
        .entry(id)
        .ok_or_else(|| schedule_not_found(id))?;
    Ok(ScheduleView::new(id, &entry))
}

/// `GET /api/schedules` — every schedule with its running state.
pub async fn list<SS, SC, DC>(State(state): State<AppState<SS, SC, DC>>) -> ListResponse
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let schedules = state
        .scheduler
        .schedules()
        .iter()
        .enumerate()
        .map(|(index, entry)| ScheduleView::new(ScheduleId::new(index), entry))
        .collect();
    ListResponse::Ok(Json(schedules))
}

/// `GET /api/schedules/{id}` — one schedule.
pub async fn get<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let id = parse_id(&id)?;
    Ok(GetResponse::Ok(Json(view_of(&state, id)?)))
}

/// `POST /api/schedules` — append a new schedule and persist the collection.
pub async fn create<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Json(req): Json<ScheduleRequest>,
) -> Result<CreateResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let catalog = state.devices.catalog().await?;
    let schedule = build_schedule(None, req, &catalog)?;
    let id = state.scheduler.save_schedule(schedule).await?;
    Ok(CreateResponse::Created(Json(view_of(&state, id)?)))
}

/// `PUT /api/schedules/{id}` — replace a schedule and persist the collection.
///
/// The runner of the replaced schedule is kept, so a running script is not
/// started a second time.
pub async fn replace<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Path(id): Path<String>,
    Json(req): Json<ScheduleRequest>,
) -> Result<GetResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let id = parse_id(&id)?;
    if !state.scheduler.exists(id) {
        return Err(schedule_not_found(id).into());
    }
    let catalog = state.devices.catalog().await?;
    let schedule = build_schedule(Some(id), req, &catalog)?;
    let id = state.scheduler.save_schedule(schedule).await?;
    Ok(GetResponse::Ok(Json(view_of(&state, id)?)))
}

/// `DELETE /api/schedules/{id}` — remove a schedule.
///
/// Every following schedule moves one id down.
pub async fn delete<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let id = parse_id(&id)?;
    state.scheduler.delete_schedule(id).await?;
    Ok(DeleteResponse::NoContent)
}

/// `POST /api/schedules/{id}/run` — launch the script now.
pub async fn run<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Path(id): Path<String>,
) -> Result<RunResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let id = parse_id(&id)?;
    let launched = state.scheduler.execute(id)?;
    Ok(RunResponse::Ok(Json(RunView { launched })))
}

/// `GET /api/schedules/{id}/runner?since=n` — latest run of a schedule.
pub async fn runner<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Path(id): Path<String>,
    Query(query): Query<OutputQuery>,
) -> Result<RunnerResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let id = parse_id(&id)?;
    let entry = state
        .scheduler
        .entry(id)
        .ok_or_else(|| schedule_not_found(id))?;
    let runner = entry.runner.ok_or_else(|| NotFoundError {
        entity: "Runner",
        id: id.to_string(),
    })?;
    Ok(RunnerResponse::Ok(Json(RunnerView::new(&runner, query.since))))
}

/// `POST /api/schedules/{id}/abort` — abort the running script of a schedule.
pub async fn abort<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Path(id): Path<String>,
) -> Result<AbortResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let id = parse_id(&id)?;
    if !state.scheduler.exists(id) {
        return Err(schedule_not_found(id).into());
    }
    let runner = state
        .scheduler
        .runner(id)
        .ok_or(ScriptHubError::Conflict(ConflictError::NotRunning))?;
    let terminated = runner.abort().await?;
    Ok(AbortResponse::Ok(Json(AbortView { terminated })))
}
