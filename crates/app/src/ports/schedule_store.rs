//! Schedule store port — persistence for the schedule collection.

use std::future::Future;

use scripthub_domain::error::ScriptHubError;
use scripthub_domain::schedule::ScheduleRecord;

/// Whole-collection persistence. The position of a record is its schedule id.
pub trait ScheduleStore {
    /// Load every stored record, in id order. Nothing stored yet yields an
    /// empty list.
    fn load(&self) -> impl Future<Output = Result<Vec<ScheduleRecord>, ScriptHubError>> + Send;

    /// Overwrite the stored collection.
    fn save(
        &self,
        records: Vec<ScheduleRecord>,
    ) -> impl Future<Output = Result<(), ScriptHubError>> + Send;
}
