//! Schedule — a script plus the conditions that launch it.
//!
//! A [`Schedule`] fires when any of its [`Condition`]s matches. Its identity
//! is its position in the scheduler collection; conditions are likewise
//! addressed by their position inside the schedule.

mod condition;
mod record;

pub use condition::{Condition, ConditionType, DeviceEventCondition, Occasion};
pub use record::{ConditionRecord, ScheduleRecord};

use crate::device::Catalog;
use crate::error::{ScriptHubError, ValidationError};
use crate::event::DeviceEvent;
use crate::id::{ConditionId, ScheduleId};
use crate::time::Timestamp;

/// A named script together with its triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Position in the scheduler collection, `None` until first saved.
    pub id: Option<ScheduleId>,
    pub name: String,
    /// Persisted only; restarting a finished script is not implemented.
    pub keep_running: bool,
    pub script: String,
    conditions: Vec<Condition>,
    /// When the script was last launched. Not persisted.
    pub last_triggered: Option<Timestamp>,
}

impl Schedule {
    /// Create a builder for constructing a [`Schedule`].
    #[must_use]
    pub fn builder() -> ScheduleBuilder {
        ScheduleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptHubError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `script` is empty ([`ValidationError::EmptyScript`])
    pub fn validate(&self) -> Result<(), ScriptHubError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.script.is_empty() {
            return Err(ValidationError::EmptyScript.into());
        }
        Ok(())
    }

    /// Append a condition and return its position.
    pub fn add_condition(&mut self, condition: Condition) -> ConditionId {
        self.conditions.push(condition);
        ConditionId::new(self.conditions.len() - 1)
    }

    pub fn clear_conditions(&mut self) {
        self.conditions.clear();
    }

    /// Conditions with their positional ids.
    pub fn conditions(&self) -> impl Iterator<Item = (ConditionId, &Condition)> {
        self.conditions
            .iter()
            .enumerate()
            .map(|(index, condition)| (ConditionId::new(index), condition))
    }

    #[must_use]
    pub fn condition(&self, id: ConditionId) -> Option<&Condition> {
        self.conditions.get(id.index())
    }

    /// Whether any condition matches the lifecycle occasion.
    #[must_use]
    pub fn matches(&self, occasion: &Occasion) -> bool {
        self.conditions.iter().any(|c| c.matches(occasion))
    }

    /// Whether any condition matches the device event.
    #[must_use]
    pub fn on_event(&self, event: &DeviceEvent) -> bool {
        self.conditions.iter().any(|c| c.on_event(event))
    }

    #[must_use]
    pub fn to_record(&self) -> ScheduleRecord {
        ScheduleRecord {
            name: self.name.clone(),
            keep_running: self.keep_running,
            script: self.script.clone(),
            conditions: self.conditions.iter().map(Condition::to_record).collect(),
        }
    }

    /// Rebuild the schedule stored at position `id`.
    ///
    /// # Errors
    ///
    /// Propagates [`Condition::from_record`] failures for any condition.
    pub fn from_record(
        id: ScheduleId,
        record: &ScheduleRecord,
        catalog: &Catalog,
    ) -> Result<Self, ValidationError> {
        let conditions = record
            .conditions
            .iter()
            .map(|c| Condition::from_record(c, catalog))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: Some(id),
            name: record.name.clone(),
            keep_running: record.keep_running,
            script: record.script.clone(),
            conditions,
            last_triggered: None,
        })
    }
}

/// Step-by-step builder for [`Schedule`].
#[derive(Debug, Default)]
pub struct ScheduleBuilder {
    id: Option<ScheduleId>,
    name: Option<String>,
    keep_running: bool,
    script: Option<String>,
    conditions: Vec<Condition>,
}

impl ScheduleBuilder {
    #[must_use]
    pub fn id(mut self, id: ScheduleId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn keep_running(mut self, keep_running: bool) -> Self {
        self.keep_running = keep_running;
        self
    }

    #[must_use]
    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Consume the builder, validate, and return a [`Schedule`].
    ///
    /// # Errors
    ///
    /// Returns [`ScriptHubError::Validation`] if the name or script is empty.
    pub fn build(self) -> Result<Schedule, ScriptHubError> {
        let schedule = Schedule {
            id: self.id,
            name: self.name.unwrap_or_default(),
            keep_running: self.keep_running,
            script: self.script.unwrap_or_default(),
            conditions: self.conditions,
            last_triggered: None,
        };
        schedule.validate()?;
        Ok(schedule)
    }
}
