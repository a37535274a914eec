//! Use-case services driven by the outside world.

pub mod manual_run_service;

pub use manual_run_service::ManualRunService;
