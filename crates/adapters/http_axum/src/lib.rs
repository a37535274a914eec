//! # scripthub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** for managing schedules and scripts
//!   (`/api/schedules`, `/api/scripts`, …)
//! - Expose the device catalog as selection lists for building
//!   device event conditions
//! - Expose runner status and captured output, for schedules and for the
//!   manual run console
//! - Map application errors into HTTP status codes
//!
//! ## Dependency rule
//! Depends on `scripthub-app` (for port traits and services) and
//! `scripthub-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
mod testing;
