//! # scripthub-app
//!
//! Application layer: use-cases, runtime supervision and **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `ScheduleStore` — load / save the persisted schedule records
//!   - `ScriptCatalog` — the scripts that may be launched and how to launch them
//!   - `DeviceCatalog` — live snapshot of the controller's devices
//!   - `ControllerFeed` — pushes controller-ready and value-change signals
//! - Run the **scheduler** loop that fires schedules on startup, on
//!   controller readiness and on device events
//! - Supervise script processes (`ScriptRunner`) and keep the bounded
//!   **event log**
//! - Own the ad hoc "run a script now" console (`ManualRunService`)
//!
//! ## Dependency rule
//! Depends on `scripthub-domain` only (plus `tokio` for tasks, channels and
//! child processes). Never imports adapter crates.

pub mod event_log;
pub mod ports;
pub mod scheduler;
pub mod script_runner;
pub mod services;
