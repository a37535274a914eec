//! `SQLite` implementation of [`ScheduleStore`].
//!
//! The whole collection lives in one row of the `records` table under the
//! `schedules` key, as the JSON array of schedule records.

use sqlx::SqlitePool;

use scripthub_app::ports::ScheduleStore;
use scripthub_domain::error::ScriptHubError;
use scripthub_domain::schedule::ScheduleRecord;

use crate::error::StorageError;

/// Key of the row holding the schedule collection.
pub const SCHEDULES_KEY: &str = "schedules";

const SELECT_VALUE: &str = "SELECT value FROM records WHERE key = ?";

const UPSERT: &str = r"
    INSERT INTO records (key, value, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
";

/// `SQLite`-backed schedule store.
#[derive(Clone)]
pub struct SqliteScheduleStore {
    pool: SqlitePool,
}

impl SqliteScheduleStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ScheduleStore for SqliteScheduleStore {
    async fn load(&self) -> Result<Vec<ScheduleRecord>, ScriptHubError> {
        let row: Option<(String,)> = sqlx::query_as(SELECT_VALUE)
            .bind(SCHEDULES_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let Some((value,)) = row else {
            return Ok(Vec::new());
        };
        let records: Vec<ScheduleRecord> =
            serde_json::from_str(&value).map_err(StorageError::from)?;
        Ok(records)
    }

    async fn save(&self, records: Vec<ScheduleRecord>) -> Result<(), ScriptHubError> {
        let value = serde_json::to_string(&records).map_err(StorageError::from)?;

        sqlx::query(UPSERT)
            .bind(SCHEDULES_KEY)
            .bind(value)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;

    async fn setup() -> SqliteScheduleStore {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteScheduleStore::new(db.pool().clone())
    }

    fn backup() -> ScheduleRecord {
        serde_json::from_value(serde_json::json!({
            "name": "backup",
            "keep_running": false,
            "script": "backup.sh",
            "conditions": [{"type_name": "on_startup"}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn should_load_empty_collection_when_nothing_is_stored() {
        let store = setup().await;
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_roundtrip_saved_records_in_order() {
        let store = setup().await;
        let mut second = backup();
        second.name = "cleanup".to_string();

        store.save(vec![backup(), second]).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], backup());
        assert_eq!(loaded[1].name, "cleanup");
    }

    #[tokio::test]
    async fn should_overwrite_previous_collection() {
        let store = setup().await;
        store.save(vec![backup(), backup()]).await.unwrap();
        store.save(vec![backup()]).await.unwrap();

        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_store_documented_json_shape() {
        let store = setup().await;
        store.save(vec![backup()]).await.unwrap();

        let (value,): (String,) = sqlx::query_as(SELECT_VALUE)
            .bind(SCHEDULES_KEY)
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&value).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "name": "backup",
                "keep_running": false,
                "script": "backup.sh",
                "conditions": [{"type_name": "on_startup"}]
            }])
        );
    }

    #[tokio::test]
    async fn should_fail_load_when_stored_document_is_malformed() {
        let store = setup().await;
        sqlx::query(UPSERT)
            .bind(SCHEDULES_KEY)
            .bind("{not json")
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, ScriptHubError::Storage(_)));
    }
}
