//! # scripthub-adapter-virtual
//!
//! Virtual device controller providing simulated devices for testing and
//! demonstration purposes.
//!
//! ## Provided devices
//!
//! | Device | Address | Parameters |
//! |--------|---------|------------|
//! | Virtual Switch | `VIR0000001` | `STATE`, flips every third update |
//! | Virtual Sensor | `VIR0000002` | `ACTUAL_TEMPERATURE` (drifts), `HUMIDITY` (constant) |
//! | Virtual Window Contact | `VIR0000003` | `STATE`, open one update out of five |
//!
//! Once started, the controller announces readiness after a configurable
//! delay, then reports every parameter at a fixed interval. A report whose
//! value differs from the previous one counts as a change.
//!
//! ## Dependency rule
//!
//! Depends on `scripthub-app` (port traits) and `scripthub-domain` only.

mod devices;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use scripthub_app::ports::{ControllerFeed, ControllerSink, DeviceCatalog};
use scripthub_domain::device::{Catalog, ParamRef};
use scripthub_domain::error::ScriptHubError;
use scripthub_domain::event::DeviceEvent;
use scripthub_domain::time::{Timestamp, now};

use devices::{Reading, VirtualDevice};

/// Behaviour of the virtual controller.
#[derive(Debug, Clone)]
pub struct VirtualConfig {
    /// A disabled controller has no devices and never becomes ready.
    pub enabled: bool,
    /// Delay between [`ControllerFeed::start`] and the ready signal.
    pub ready_delay: Duration,
    /// Period of the value reports.
    pub update_interval: Duration,
}

impl Default for VirtualConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ready_delay: Duration::from_secs(2),
            update_interval: Duration::from_secs(30),
        }
    }
}

/// Last reported value of a parameter and when it last changed.
struct Observed {
    value: serde_json::Value,
    time_changed: Timestamp,
}

struct Inner {
    config: VirtualConfig,
    devices: Vec<VirtualDevice>,
    observed: Mutex<HashMap<ParamRef, Observed>>,
}

impl Inner {
    /// Turn a reading into an event, tracking when the value last changed.
    fn observe(&self, reading: Reading, time: Timestamp) -> DeviceEvent {
        let mut observed = self.observed.lock().unwrap_or_else(PoisonError::into_inner);
        let time_changed = match observed.get_mut(&reading.param) {
            Some(previous) if previous.value == reading.value => previous.time_changed,
            Some(previous) => {
                previous.value = reading.value.clone();
                previous.time_changed = time;
                time
            }
            None => {
                observed.insert(
                    reading.param.clone(),
                    Observed {
                        value: reading.value.clone(),
                        time_changed: time,
                    },
                );
                time
            }
        };
        DeviceEvent {
            time,
            time_changed,
            param: reading.param,
            value: reading.value,
            formatted_value: reading.formatted_value,
        }
    }

    async fn run(self: Arc<Self>, sink: ControllerSink) {
        tokio::time::sleep(self.config.ready_delay).await;
        if !sink.ready().await {
            return;
        }
        tracing::info!(devices = self.devices.len(), "virtual controller ready");

        let mut ticker = tokio::time::interval(self.config.update_interval);
        let mut step: u64 = 0;
        loop {
            ticker.tick().await;
            for device in &self.devices {
                for reading in device.readings(step) {
                    let event = self.observe(reading, now());
                    if !sink.value_updated(event).await {
                        tracing::debug!("scheduler gone, stopping virtual controller");
                        return;
                    }
                }
            }
            step += 1;
        }
    }
}

/// Simulated device controller.
///
/// Cheap to clone; clones share the same simulation state.
#[derive(Clone)]
pub struct VirtualController {
    inner: Arc<Inner>,
}

impl Default for VirtualController {
    fn default() -> Self {
        Self::new(VirtualConfig::default())
    }
}

impl VirtualController {
    #[must_use]
    pub fn new(config: VirtualConfig) -> Self {
        let devices = if config.enabled {
            VirtualDevice::all()
        } else {
            Vec::new()
        };
        Self {
            inner: Arc::new(Inner {
                config,
                devices,
                observed: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl DeviceCatalog for VirtualController {
    async fn catalog(&self) -> Result<Catalog, ScriptHubError> {
        Ok(Catalog::new(
            self.inner.devices.iter().map(VirtualDevice::describe).collect(),
        ))
    }
}

impl ControllerFeed for VirtualController {
    async fn start(&self, sink: ControllerSink) -> Result<(), ScriptHubError> {
        if !self.inner.config.enabled {
            tracing::info!("virtual controller disabled");
            return Ok(());
        }
        tokio::spawn(Arc::clone(&self.inner).run(sink));
        Ok(())
    }
}
