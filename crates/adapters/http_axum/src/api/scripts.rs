//! JSON handlers for the script catalog.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use scripthub_app::ports::{DeviceCatalog, ScheduleStore, ScriptCatalog};

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<String>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the install and remove endpoints.
pub enum ChangeResponse {
    NoContent,
}

impl IntoResponse for ChangeResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/scripts` — installed script names, sorted.
pub async fn list<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
) -> Result<ListResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let scripts = state.scripts.list().await?;
    Ok(ListResponse::Ok(Json(scripts)))
}

/// `PUT /api/scripts/{name}` — install or replace a script with the raw body.
pub async fn install<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<ChangeResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    state.scripts.install(&name, body.to_vec()).await?;
    Ok(ChangeResponse::NoContent)
}

/// `DELETE /api/scripts/{name}` — remove a script.
///
/// Schedules referring to it are kept; they fail to launch until the script
/// is installed again.
pub async fn remove<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Path(name): Path<String>,
) -> Result<ChangeResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    state.scripts.remove(&name).await?;
    Ok(ChangeResponse::NoContent)
}
