//! Device catalog — devices, their channels and the parameters they expose.
//!
//! The catalog is owned by the device controller and may change between
//! restarts. Conditions store plain addresses ([`ParamRef`]) and resolve them
//! against a fresh [`Catalog`] snapshot every time they are loaded.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Stable address of a single parameter: device → channel → parameter id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamRef {
    pub device_address: String,
    pub channel_address: String,
    pub param_id: String,
}

impl ParamRef {
    #[must_use]
    pub fn new(
        device_address: impl Into<String>,
        channel_address: impl Into<String>,
        param_id: impl Into<String>,
    ) -> Self {
        Self {
            device_address: device_address.into(),
            channel_address: channel_address.into(),
            param_id: param_id.into(),
        }
    }
}

impl fmt::Display for ParamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_address, self.param_id)
    }
}

/// A readable or writable value of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: String,
    pub title: String,
}

/// A functional unit of a device (e.g. one relay of a two-relay actuator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub address: String,
    pub name: String,
    pub parameters: Vec<Parameter>,
}

impl Channel {
    #[must_use]
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn parameter(mut self, id: impl Into<String>, title: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            id: id.into(),
            title: title.into(),
        });
        self
    }

    /// Look up a parameter by id.
    #[must_use]
    pub fn get_parameter(&self, id: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.id == id)
    }
}

/// A physical device known to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub address: String,
    pub name: String,
    pub channels: Vec<Channel>,
}

impl Device {
    #[must_use]
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            channels: Vec::new(),
        }
    }

    #[must_use]
    pub fn channel(mut self, channel: Channel) -> Self {
        self.channels.push(channel);
        self
    }

    /// Look up a channel by its address.
    #[must_use]
    pub fn channel_by_address(&self, address: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.address == address)
    }
}

/// Display names of a parameter that was successfully resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedParam {
    pub device_name: String,
    pub channel_name: String,
    pub param_title: String,
}

/// One entry of a selection list: the value to submit and its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

/// Snapshot of every device the controller currently knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    devices: Vec<Device>,
}

impl Catalog {
    #[must_use]
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    #[must_use]
    pub fn device(&self, address: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.address == address)
    }

    /// Resolve a parameter reference to its display names.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownDevice`], [`ValidationError::UnknownChannel`]
    /// or [`ValidationError::UnknownParameter`] naming the first level of the
    /// reference that is missing from the catalog.
    pub fn resolve(&self, param: &ParamRef) -> Result<ResolvedParam, ValidationError> {
        let device = self
            .device(&param.device_address)
            .ok_or(ValidationError::UnknownDevice)?;
        let channel = device
            .channel_by_address(&param.channel_address)
            .ok_or(ValidationError::UnknownChannel)?;
        let parameter = channel
            .get_parameter(&param.param_id)
            .ok_or(ValidationError::UnknownParameter)?;

        Ok(ResolvedParam {
            device_name: device.name.clone(),
            channel_name: channel.name.clone(),
            param_title: parameter.title.clone(),
        })
    }

    /// All devices, sorted by label.
    #[must_use]
    pub fn device_choices(&self) -> Vec<Choice> {
        sorted(
            self.devices
                .iter()
                .map(|d| choice(&d.address, &d.name, &d.address)),
        )
    }

    /// Channels of one device, sorted by label. Empty for an unknown device.
    #[must_use]
    pub fn channel_choices(&self, device_address: &str) -> Vec<Choice> {
        let Some(device) = self.device(device_address) else {
            return Vec::new();
        };
        sorted(
            device
                .channels
                .iter()
                .map(|c| choice(&c.address, &c.name, &c.address)),
        )
    }

    /// Parameters of one channel, sorted by label. Empty for an unknown
    /// device or channel.
    #[must_use]
    pub fn parameter_choices(&self, device_address: &str, channel_address: &str) -> Vec<Choice> {
        let Some(channel) = self
            .device(device_address)
            .and_then(|d| d.channel_by_address(channel_address))
        else {
            return Vec::new();
        };
        sorted(
            channel
                .parameters
                .iter()
                .map(|p| choice(&p.id, &p.title, &p.id)),
        )
    }
}

fn choice(value: &str, name: &str, address: &str) -> Choice {
    Choice {
        value: value.to_string(),
        label: format!("{name} ({address})"),
    }
}

fn sorted(choices: impl Iterator<Item = Choice>) -> Vec<Choice> {
    let mut choices: Vec<Choice> = choices.collect();
    choices.sort_by(|a, b| a.label.cmp(&b.label));
    choices
}
