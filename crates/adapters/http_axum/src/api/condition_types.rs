//! JSON handler for the condition type registry.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use scripthub_app::ports::{DeviceCatalog, ScheduleStore, ScriptCatalog};
use scripthub_domain::schedule::ConditionType;

use crate::state::AppState;

/// One registered condition type.
#[derive(Debug, Serialize)]
pub struct ConditionTypeView {
    pub type_name: &'static str,
    pub type_title: &'static str,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<ConditionTypeView>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/condition-types` — every condition type a schedule can use.
pub async fn list<SS, SC, DC>(State(_state): State<AppState<SS, SC, DC>>) -> ListResponse
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let types = ConditionType::ALL
        .into_iter()
        .map(|condition_type| ConditionTypeView {
            type_name: condition_type.type_name(),
            type_title: condition_type.type_title(),
        })
        .collect();
    ListResponse::Ok(Json(types))
}
