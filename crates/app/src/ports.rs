//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod controller;
pub mod device_catalog;
pub mod schedule_store;
pub mod script_catalog;

pub use controller::{ControllerFeed, ControllerSignal, ControllerSink};
pub use device_catalog::DeviceCatalog;
pub use schedule_store::ScheduleStore;
pub use script_catalog::{ScriptCatalog, ScriptCommand};
