//! Device event — a value-change notification pushed by the controller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::device::ParamRef;
use crate::error::ValidationError;
use crate::time::Timestamp;

/// Whether a notification carried a new value or just refreshed the old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// The value was reported again; it may or may not differ.
    Updated,
    /// The value differs from the previous one.
    Changed,
}

impl EventKind {
    /// Every kind, in selection-list order.
    pub const ALL: [Self; 2] = [Self::Updated, Self::Changed];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Changed => "changed",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Updated => "Value updated",
            Self::Changed => "Value changed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "updated" => Ok(Self::Updated),
            "changed" => Ok(Self::Changed),
            other => Err(ValidationError::UnknownEventKind(other.to_string())),
        }
    }
}

/// A single value notification for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    /// When the value was last reported.
    pub time: Timestamp,
    /// When the value last differed from its predecessor.
    pub time_changed: Timestamp,
    pub param: ParamRef,
    /// Raw value as reported by the controller.
    pub value: serde_json::Value,
    /// Value rendered with unit / enum label.
    pub formatted_value: String,
}

impl DeviceEvent {
    /// A report that coincides with the last change is a change; anything
    /// else is a plain update.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        if self.time == self.time_changed {
            EventKind::Changed
        } else {
            EventKind::Updated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(time: Timestamp, time_changed: Timestamp) -> DeviceEvent {
        DeviceEvent {
            time,
            time_changed,
            param: ParamRef::new("LEQ0000001", "LEQ0000001:1", "STATE"),
            value: serde_json::json!(true),
            formatted_value: "on".to_string(),
        }
    }

    #[test]
    fn should_be_changed_when_time_equals_time_changed() {
        let ts = crate::time::now();
        assert_eq!(event(ts, ts).kind(), EventKind::Changed);
    }

    #[test]
    fn should_be_updated_when_time_differs_from_time_changed() {
        let ts = crate::time::now();
        assert_eq!(
            event(ts, ts - Duration::seconds(30)).kind(),
            EventKind::Updated
        );
    }

    #[test]
    fn should_parse_known_event_kinds() {
        assert_eq!("updated".parse::<EventKind>().unwrap(), EventKind::Updated);
        assert_eq!("changed".parse::<EventKind>().unwrap(), EventKind::Changed);
    }

    #[test]
    fn should_reject_unknown_event_kind() {
        let err = "toggled".parse::<EventKind>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownEventKind("toggled".to_string()));
    }

    #[test]
    fn should_serialize_kind_lowercase() {
        assert_eq!(
            serde_json::to_string(&EventKind::Changed).unwrap(),
            "\"changed\""
        );
    }
}
