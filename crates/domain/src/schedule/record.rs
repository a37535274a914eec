//! Persisted shape of schedules and conditions.
//!
//! A whole collection is stored as one JSON array of [`ScheduleRecord`]s; the
//! position in that array is the schedule id. Conditions keep their
//! discriminant in `type_name` and their variant fields next to it.

use serde::{Deserialize, Serialize};

/// A stored condition: discriminant plus variant fields by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRecord {
    pub type_name: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ConditionRecord {
    /// A record without variant fields.
    #[must_use]
    pub fn bare(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: serde_json::Map::new(),
        }
    }
}

/// A stored schedule. Unknown keys are ignored when reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub keep_running: bool,
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub conditions: Vec<ConditionRecord>,
}
