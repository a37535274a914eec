//! Device catalog port — what the controller currently knows about.

use std::future::Future;

use scripthub_domain::device::Catalog;
use scripthub_domain::error::ScriptHubError;

/// Source of live [`Catalog`] snapshots.
pub trait DeviceCatalog {
    fn catalog(&self) -> impl Future<Output = Result<Catalog, ScriptHubError>> + Send;
}
