//! Storage-specific error type wrapping sqlx errors.

use scripthub_domain::error::ScriptHubError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// A stored document is not valid JSON of the expected shape.
    #[error("malformed stored document")]
    Json(#[from] serde_json::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for ScriptHubError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_wrap_json_error_as_storage_error() {
        let json_err = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let err: ScriptHubError = StorageError::from(json_err).into();
        assert!(matches!(err, ScriptHubError::Storage(_)));
    }
}
