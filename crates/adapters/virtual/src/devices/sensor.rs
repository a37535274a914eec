//! Virtual climate sensor — temperature drifts every step, humidity is constant.

use scripthub_domain::device::{Channel, Device, ParamRef};

use super::Reading;

const ADDRESS: &str = "VIR0000002";
const CHANNEL: &str = "VIR0000002:1";

/// A simulated temperature and humidity sensor.
pub struct VirtualSensor;

impl VirtualSensor {
    #[must_use]
    pub fn describe(&self) -> Device {
        Device::new(ADDRESS, "Virtual Sensor").channel(
            Channel::new(CHANNEL, "Virtual Sensor:1")
                .parameter("ACTUAL_TEMPERATURE", "Actual temperature")
                .parameter("HUMIDITY", "Humidity"),
        )
    }

    #[must_use]
    pub fn readings(&self, step: u64) -> Vec<Reading> {
        // 21.0 °C rising by 0.5 °C per step, wrapping every ten steps.
        let half_degrees = 42 + u32::try_from(step % 10).unwrap_or_default();
        let temperature = f64::from(half_degrees) / 2.0;
        vec![
            Reading {
                param: ParamRef::new(ADDRESS, CHANNEL, "ACTUAL_TEMPERATURE"),
                value: serde_json::json!(temperature),
                formatted_value: format!("{temperature:.1} \u{b0}C"),
            },
            Reading {
                param: ParamRef::new(ADDRESS, CHANNEL, "HUMIDITY"),
                value: serde_json::json!(45),
                formatted_value: "45 %".to_string(),
            },
        ]
    }
}
