//! Virtual window contact — opens for one step out of five.

use scripthub_domain::device::{Channel, Device, ParamRef};

use super::Reading;

const ADDRESS: &str = "VIR0000003";
const CHANNEL: &str = "VIR0000003:1";

/// A simulated window contact.
pub struct VirtualContact;

impl VirtualContact {
    #[must_use]
    pub fn describe(&self) -> Device {
        Device::new(ADDRESS, "Virtual Window Contact")
            .channel(Channel::new(CHANNEL, "Virtual Window Contact:1").parameter("STATE", "Open"))
    }

    #[must_use]
    pub fn readings(&self, step: u64) -> Vec<Reading> {
        let open = step % 5 == 4;
        vec![Reading {
            param: ParamRef::new(ADDRESS, CHANNEL, "STATE"),
            value: serde_json::Value::Bool(open),
            formatted_value: if open { "open" } else { "closed" }.to_string(),
        }]
    }
}
