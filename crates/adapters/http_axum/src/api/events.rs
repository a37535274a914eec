//! JSON handler for the device event log.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use scripthub_app::event_log::EVENT_LOG_CAPACITY;
use scripthub_app::ports::{DeviceCatalog, ScheduleStore, ScriptCatalog};
use scripthub_domain::event::{DeviceEvent, EventKind};

use crate::state::AppState;

/// Number of events returned when no limit is given.
pub const DEFAULT_EVENT_LIMIT: usize = 100;

/// `?limit=` query of the list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// One logged notification with its derived kind.
#[derive(Debug, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: DeviceEvent,
    pub kind: EventKind,
}

/// The event log as shown to clients.
#[derive(Debug, Serialize)]
pub struct EventsView {
    /// Notifications received since startup, including evicted ones.
    pub total: u64,
    pub controller_ready: bool,
    /// Newest first.
    pub events: Vec<EventView>,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<EventsView>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/events?limit=n` — most recent device events.
pub async fn list<SS, SC, DC>(
    State(state): State<AppState<SS, SC, DC>>,
    Query(query): Query<ListQuery>,
) -> ListResponse
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .min(EVENT_LOG_CAPACITY);
    let events = state
        .scheduler
        .recent_events(limit)
        .into_iter()
        .map(|event| EventView {
            kind: event.kind(),
            event,
        })
        .collect();
    ListResponse::Ok(Json(EventsView {
        total: state.scheduler.event_count(),
        controller_ready: state.scheduler.is_controller_ready(),
        events,
    }))
}
