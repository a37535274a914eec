//! Filesystem errors of the script catalog.

use std::path::PathBuf;

use scripthub_domain::error::ScriptHubError;

#[derive(Debug, thiserror::Error)]
pub enum ScriptCatalogError {
    #[error("unable to access script directory {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ScriptCatalogError> for ScriptHubError {
    fn from(err: ScriptCatalogError) -> Self {
        Self::Storage(Box::new(err))
    }
}
