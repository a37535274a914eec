//! # scripthub-domain
//!
//! Pure domain model for the scripthub script scheduler.
//!
//! ## Responsibilities
//! - Foundational types: positional identifiers, error conventions, timestamps
//! - Define the **device catalog** model (devices → channels → parameters)
//!   used to resolve the parameters a condition listens to
//! - Define **device events** (value-change notifications) and their kind
//! - Define **Schedules** (script + conditions) and the closed set of
//!   **Conditions** that decide when a schedule fires
//! - Define the persisted **record** shape of schedules and conditions
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod event;
pub mod schedule;
