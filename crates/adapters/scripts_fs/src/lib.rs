//! # scripthub-adapter-scripts-fs
//!
//! Script catalog backed by a plain directory.
//!
//! ## Responsibilities
//! - Implement the `ScriptCatalog` port defined in `scripthub-app::ports`
//! - List, install and remove the script files of one directory
//! - Build the interpreter command line that launches a script
//!
//! ## Dependency rule
//! Depends on `scripthub-app` (for port traits) and `scripthub-domain` (for domain types).

mod catalog;
mod error;

pub use catalog::{DEFAULT_INTERPRETER, FsScriptCatalog, MAX_SCRIPT_SIZE};
pub use error::ScriptCatalogError;
