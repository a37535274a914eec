//! Conditions — what makes a schedule fire.
//!
//! A schedule fires when *any* of its conditions matches. Conditions are
//! evaluated two ways:
//!
//! - pull: the scheduler asks [`Condition::matches`] for a lifecycle
//!   [`Occasion`] (startup, controller ready, a ticker tick);
//! - push: every incoming [`DeviceEvent`] is offered to
//!   [`Condition::on_event`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::device::{Catalog, ParamRef, ResolvedParam};
use crate::error::ValidationError;
use crate::event::{DeviceEvent, EventKind};
use crate::time::Timestamp;

use super::record::ConditionRecord;

/// Registry of every condition variant: stable name plus display title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    OnStartup,
    #[serde(alias = "on_ccu_initialized")]
    OnControllerReady,
    OnDeviceEvent,
    OnTime,
}

impl ConditionType {
    /// Every registered type, in selection-list order.
    pub const ALL: [Self; 4] = [
        Self::OnStartup,
        Self::OnControllerReady,
        Self::OnDeviceEvent,
        Self::OnTime,
    ];

    /// Discriminant written to persisted records.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::OnStartup => "on_startup",
            Self::OnControllerReady => "on_controller_ready",
            Self::OnDeviceEvent => "on_device_event",
            Self::OnTime => "on_time",
        }
    }

    #[must_use]
    pub fn type_title(self) -> &'static str {
        match self {
            Self::OnStartup => "on manager startup",
            Self::OnControllerReady => "on connection with controller initialized",
            Self::OnDeviceEvent => "on device event",
            Self::OnTime => "on time",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ConditionType {
    type Err = ValidationError;

    /// Accepts every [`type_name`](Self::type_name), plus the older
    /// `on_ccu_initialized` spelling of [`OnControllerReady`](Self::OnControllerReady).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "on_ccu_initialized" {
            return Ok(Self::OnControllerReady);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.type_name() == s)
            .ok_or_else(|| ValidationError::UnknownConditionType(s.to_string()))
    }
}

/// A lifecycle moment the scheduler evaluates conditions against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occasion {
    /// First iteration of the scheduler loop.
    Startup,
    /// The device controller finished its initial synchronisation.
    ControllerReady,
    /// Periodic ticker.
    Tick(Timestamp),
}

/// Fires when a given parameter reports a value of the given kind.
///
/// The raw reference is always kept. When the reference could not be
/// resolved against the catalog the condition is inert: it never matches but
/// is still written back unchanged so it can resolve again later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEventCondition {
    target: ParamRef,
    event_kind: EventKind,
    resolved: Option<ResolvedParam>,
}

impl DeviceEventCondition {
    /// Build a condition from user input.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownDevice`], [`ValidationError::UnknownChannel`]
    /// or [`ValidationError::UnknownParameter`] if the reference does not
    /// resolve against `catalog`.
    pub fn new(
        catalog: &Catalog,
        target: ParamRef,
        event_kind: EventKind,
    ) -> Result<Self, ValidationError> {
        let resolved = catalog.resolve(&target)?;
        Ok(Self {
            target,
            event_kind,
            resolved: Some(resolved),
        })
    }

    /// Build a condition from stored data, tolerating stale references.
    #[must_use]
    pub fn restore(catalog: &Catalog, target: ParamRef, event_kind: EventKind) -> Self {
        let resolved = catalog.resolve(&target).ok();
        Self {
            target,
            event_kind,
            resolved,
        }
    }

    #[must_use]
    pub fn target(&self) -> &ParamRef {
        &self.target
    }

    #[must_use]
    pub fn event_kind(&self) -> EventKind {
        self.event_kind
    }

    #[must_use]
    pub fn resolved(&self) -> Option<&ResolvedParam> {
        self.resolved.as_ref()
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Whether `event` concerns the watched parameter with the watched kind.
    #[must_use]
    pub fn on_event(&self, event: &DeviceEvent) -> bool {
        self.is_resolved() && event.param == self.target && event.kind() == self.event_kind
    }
}

/// Stored fields of an `on_device_event` condition.
#[derive(Deserialize)]
struct DeviceEventFields {
    device_address: String,
    channel_address: String,
    param_id: String,
    event_type: String,
}

/// One trigger of a schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    OnStartup,
    OnControllerReady,
    OnDeviceEvent(DeviceEventCondition),
    /// Recognised but never matches.
    OnTime,
}

impl Condition {
    #[must_use]
    pub fn condition_type(&self) -> ConditionType {
        match self {
            Self::OnStartup => ConditionType::OnStartup,
            Self::OnControllerReady => ConditionType::OnControllerReady,
            Self::OnDeviceEvent(_) => ConditionType::OnDeviceEvent,
            Self::OnTime => ConditionType::OnTime,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.condition_type().type_name()
    }

    #[must_use]
    pub fn type_title(&self) -> &'static str {
        self.condition_type().type_title()
    }

    /// Pull evaluation against a lifecycle occasion.
    #[must_use]
    pub fn matches(&self, occasion: &Occasion) -> bool {
        match (self, occasion) {
            (Self::OnStartup, Occasion::Startup)
            | (Self::OnControllerReady, Occasion::ControllerReady) => true,
            // on_time carries no time of day yet, ticks never match
            _ => false,
        }
    }

    /// Push evaluation against a device event.
    #[must_use]
    pub fn on_event(&self, event: &DeviceEvent) -> bool {
        match self {
            Self::OnDeviceEvent(inner) => inner.on_event(event),
            Self::OnStartup | Self::OnControllerReady | Self::OnTime => false,
        }
    }

    #[must_use]
    pub fn to_record(&self) -> ConditionRecord {
        let mut record = ConditionRecord::bare(self.type_name());
        if let Self::OnDeviceEvent(inner) = self {
            let target = inner.target();
            for (key, value) in [
                ("device_address", target.device_address.as_str()),
                ("channel_address", target.channel_address.as_str()),
                ("param_id", target.param_id.as_str()),
                ("event_type", inner.event_kind().as_str()),
            ] {
                record
                    .fields
                    .insert(key.to_string(), serde_json::Value::from(value));
            }
        }
        record
    }

    /// Rebuild a condition from a stored record.
    ///
    /// Device references are re-resolved against `catalog`; a stale
    /// reference yields an inert condition rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownConditionType`] for an unregistered
    /// `type_name`, [`ValidationError::MalformedCondition`] when variant
    /// fields are missing or mistyped, and [`ValidationError::UnknownEventKind`]
    /// for an unknown `event_type`.
    pub fn from_record(
        record: &ConditionRecord,
        catalog: &Catalog,
    ) -> Result<Self, ValidationError> {
        Self::decode(record, |target, kind| {
            Ok(DeviceEventCondition::restore(catalog, target, kind))
        })
    }

    /// Build a condition from user input in the record shape.
    ///
    /// Unlike [`from_record`](Self::from_record), a device reference that
    /// does not resolve against `catalog` is rejected.
    ///
    /// # Errors
    ///
    /// Same as [`from_record`](Self::from_record), plus
    /// [`ValidationError::UnknownDevice`], [`ValidationError::UnknownChannel`]
    /// or [`ValidationError::UnknownParameter`] for unresolvable references.
    pub fn from_input(
        record: &ConditionRecord,
        catalog: &Catalog,
    ) -> Result<Self, ValidationError> {
        Self::decode(record, |target, kind| {
            DeviceEventCondition::new(catalog, target, kind)
        })
    }

    fn decode(
        record: &ConditionRecord,
        device_event: impl FnOnce(
            ParamRef,
            EventKind,
        ) -> Result<DeviceEventCondition, ValidationError>,
    ) -> Result<Self, ValidationError> {
        let condition_type: ConditionType = record.type_name.parse()?;
        Ok(match condition_type {
            ConditionType::OnStartup => Self::OnStartup,
            ConditionType::OnControllerReady => Self::OnControllerReady,
            ConditionType::OnTime => Self::OnTime,
            ConditionType::OnDeviceEvent => {
                let fields: DeviceEventFields =
                    serde_json::from_value(serde_json::Value::Object(record.fields.clone()))
                        .map_err(|err| ValidationError::MalformedCondition {
                            type_name: condition_type.type_name(),
                            reason: err.to_string(),
                        })?;
                let kind: EventKind = fields.event_type.parse()?;
                let target = ParamRef::new(
                    fields.device_address,
                    fields.channel_address,
                    fields.param_id,
                );
                Self::OnDeviceEvent(device_event(target, kind)?)
            }
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnDeviceEvent(inner) => match inner.resolved() {
                Some(resolved) => write!(
                    f,
                    "{}: {}, {}, {}, {}",
                    self.type_title(),
                    resolved.device_name,
                    resolved.channel_name,
                    resolved.param_title,
                    inner.event_kind().title()
                ),
                None => write!(
                    f,
                    "{} (unresolved {}, {})",
                    self.type_title(),
                    inner.target(),
                    inner.event_kind().title()
                ),
            },
            _ => f.write_str(self.type_title()),
        }
    }
}
