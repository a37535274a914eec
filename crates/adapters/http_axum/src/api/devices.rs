//! JSON handlers for the device catalog selection lists.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use scripthub_app::ports::{DeviceCatalog, ScheduleStore, ScriptCatalog};
use scripthub_domain::device::Choice;

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the choice list endpoints.
pub enum ChoicesResponse {
    Ok(Json<Vec<Choice>>),
}

impl IntoResponse for ChoicesResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/devices` — every known device, sorted by label.
pub async fn list<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
) -> Result<ChoicesResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let catalog = state.devices.catalog().await?;
    Ok(ChoicesResponse::Ok(Json(catalog.device_choices())))
}

/// `GET /api/devices/{device}/channels` — channels of one device.
///
/// An unknown device yields an empty list.
pub async fn channels<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Path(device): Path<String>,
) -> Result<ChoicesResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let catalog = state.devices.catalog().await?;
    Ok(ChoicesResponse::Ok(Json(catalog.channel_choices(&device))))
}

/// `GET /api/devices/{device}/channels/{channel}/parameters` — parameters of
/// one channel.
pub async fn parameters<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Path((device, channel)): Path<(String, String)>,
) -> Result<ChoicesResponse, ApiError>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let catalog = state.devices.catalog().await?;
    Ok(ChoicesResponse::Ok(Json(
        catalog.parameter_choices(&device, &channel),
    )))
}
