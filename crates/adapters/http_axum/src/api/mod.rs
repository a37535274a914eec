//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod condition_types;
#[allow(clippy::missing_errors_doc)]
pub mod devices;
#[allow(clippy::missing_errors_doc)]
pub mod events;
#[allow(clippy::missing_errors_doc)]
pub mod run;
#[allow(clippy::missing_errors_doc)]
pub mod schedules;
#[allow(clippy::missing_errors_doc)]
pub mod scripts;

use axum::Router;
use axum::routing::{get, post, put};

use scripthub_app::ports::{DeviceCatalog, ScheduleStore, ScriptCatalog};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<SS, SC, DC>() -> Router<AppState<SS, SC, DC>>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    Router::new()
        // Scripts
        .route("/scripts", get(scripts::list::<SS, SC, DC>))
        .route(
            "/scripts/{name}",
            put(scripts::install::<SS, SC, DC>).delete(scripts::remove::<SS, SC, DC>),
        )
        // Selection lists
        .route(
            "/condition-types",
            get(condition_types::list::<SS, SC, DC>),
        )
        .route("/devices", get(devices::list::<SS, SC, DC>))
        .route(
            "/devices/{device}/channels",
            get(devices::channels::<SS, SC, DC>),
        )
        .route(
            "/devices/{device}/channels/{channel}/parameters",
            get(devices::parameters::<SS, SC, DC>),
        )
        // Schedules
        .route(
            "/schedules",
            get(schedules::list::<SS, SC, DC>).post(schedules::create::<SS, SC, DC>),
        )
        .route(
            "/schedules/{id}",
            get(schedules::get::<SS, SC, DC>)
                .put(schedules::replace::<SS, SC, DC>)
                .delete(schedules::delete::<SS, SC, DC>),
        )
        .route("/schedules/{id}/run", post(schedules::run::<SS, SC, DC>))
        .route(
            "/schedules/{id}/runner",
            get(schedules::runner::<SS, SC, DC>),
        )
        .route(
            "/schedules/{id}/abort",
            post(schedules::abort::<SS, SC, DC>),
        )
        // Events
        .route("/events", get(events::list::<SS, SC, DC>))
        // Manual run console
        .route(
            "/run",
            get(run::status::<SS, SC, DC>).post(run::start::<SS, SC, DC>),
        )
        .route("/run/abort", post(run::abort::<SS, SC, DC>))
}
