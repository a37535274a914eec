//! Shared application state for axum handlers.

use std::sync::Arc;

use scripthub_app::ports::{DeviceCatalog, ScheduleStore, ScriptCatalog};
use scripthub_app::scheduler::Scheduler;
use scripthub_app::services::manual_run_service::ManualRunService;

/// Application state shared across all axum handlers.
///
/// Generic over the schedule store, script catalog and device catalog to
/// avoid dynamic dispatch. `Clone` is implemented manually so the underlying
/// types themselves do not need to be `Clone`.
pub struct AppState<SS, SC, DC> {
    /// Schedule collection, runners and event log.
    pub scheduler: Arc<Scheduler<SS, SC, DC>>,
    /// Ad hoc script execution.
    pub manual_run: Arc<ManualRunService<SC>>,
    /// Script listing, upload and removal.
    pub scripts: Arc<SC>,
    /// Device catalog used to validate device event conditions.
    pub devices: Arc<DC>,
}

impl<SS, SC, DC> Clone for AppState<SS, SC, DC> {
    fn clone(&self) -> Self {
        Self {
            scheduler: Arc::clone(&self.scheduler),
            manual_run: Arc::clone(&self.manual_run),
            scripts: Arc::clone(&self.scripts),
            devices: Arc::clone(&self.devices),
        }
    }
}

impl<SS, SC, DC> AppState<SS, SC, DC>
where
    SS: ScheduleStore + Send + Sync + 'static,
    SC: ScriptCatalog + Send + Sync + 'static,
    DC: DeviceCatalog + Send + Sync + 'static,
{
    /// Create a new application state.
    ///
    /// The scheduler is shared with its background loop, so it is taken
    /// already wrapped.
    pub fn new(
        scheduler: Arc<Scheduler<SS, SC, DC>>,
        manual_run: ManualRunService<SC>,
        scripts: SC,
        devices: DC,
    ) -> Self {
        Self {
            scheduler,
            manual_run: Arc::new(manual_run),
            scripts: Arc::new(scripts),
            devices: Arc::new(devices),
        }
    }
}
