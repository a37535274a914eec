//! # scripthub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `ScheduleStore` port defined in `scripthub-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Store the schedule collection as one JSON document in a key/value table
//!
//! ## Dependency rule
//! Depends on `scripthub-app` (for port traits) and `scripthub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod pool;
pub mod schedule_store;

pub use error::StorageError;
pub use pool::{Config, Database};
pub use schedule_store::SqliteScheduleStore;
