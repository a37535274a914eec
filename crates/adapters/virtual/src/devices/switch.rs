//! Virtual switch — flips its state every third step.

use scripthub_domain::device::{Channel, Device, ParamRef};

use super::{Reading, on_off};

const ADDRESS: &str = "VIR0000001";
const CHANNEL: &str = "VIR0000001:1";

/// A simulated switch actuator.
pub struct VirtualSwitch;

impl VirtualSwitch {
    #[must_use]
    pub fn describe(&self) -> Device {
        Device::new(ADDRESS, "Virtual Switch")
            .channel(Channel::new(CHANNEL, "Virtual Switch:1").parameter("STATE", "State"))
    }

    #[must_use]
    pub fn readings(&self, step: u64) -> Vec<Reading> {
        let on = (step / 3) % 2 == 1;
        vec![Reading {
            param: ParamRef::new(ADDRESS, CHANNEL, "STATE"),
            value: serde_json::Value::Bool(on),
            formatted_value: on_off(on).to_string(),
        }]
    }
}
