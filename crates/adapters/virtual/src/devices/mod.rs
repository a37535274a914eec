//! Virtual device implementations — switch, climate sensor, window contact.
//!
//! Each virtual device has a fixed address so conditions referencing it stay
//! resolvable across restarts. Readings are a pure function of the update
//! step, which keeps the simulation deterministic.

mod contact;
mod sensor;
mod switch;

pub use contact::VirtualContact;
pub use sensor::VirtualSensor;
pub use switch::VirtualSwitch;

use scripthub_domain::device::{Device, ParamRef};

/// One simulated parameter value.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub param: ParamRef,
    pub value: serde_json::Value,
    pub formatted_value: String,
}

/// Wrapper enum for the concrete virtual device types.
pub enum VirtualDevice {
    Switch(VirtualSwitch),
    Sensor(VirtualSensor),
    Contact(VirtualContact),
}

impl VirtualDevice {
    /// The full default set.
    #[must_use]
    pub fn all() -> Vec<Self> {
        vec![
            Self::Switch(VirtualSwitch),
            Self::Sensor(VirtualSensor),
            Self::Contact(VirtualContact),
        ]
    }

    /// Catalog entry of the device.
    #[must_use]
    pub fn describe(&self) -> Device {
        match self {
            Self::Switch(d) => d.describe(),
            Self::Sensor(d) => d.describe(),
            Self::Contact(d) => d.describe(),
        }
    }

    /// Values reported at update `step`.
    #[must_use]
    pub fn readings(&self, step: u64) -> Vec<Reading> {
        match self {
            Self::Switch(d) => d.readings(step),
            Self::Sensor(d) => d.readings(step),
            Self::Contact(d) => d.readings(step),
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}
