//! Controller feed port — signals pushed by the device controller.
//!
//! The controller announces once that its initial synchronisation is done and
//! then reports every value notification it receives. Both go through a
//! [`ControllerSink`] into the scheduler's signal channel.

use std::future::Future;

use tokio::sync::mpsc;

use scripthub_domain::error::ScriptHubError;
use scripthub_domain::event::DeviceEvent;

/// A message from the controller to the scheduler loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerSignal {
    Ready,
    ValueUpdated(DeviceEvent),
}

/// Sending half of the scheduler's signal channel, handed to a feed.
#[derive(Debug, Clone)]
pub struct ControllerSink {
    sender: mpsc::Sender<ControllerSignal>,
}

impl ControllerSink {
    #[must_use]
    pub fn new(sender: mpsc::Sender<ControllerSignal>) -> Self {
        Self { sender }
    }

    /// Announce that the controller finished its initial synchronisation.
    ///
    /// Returns `false` once the receiving scheduler is gone.
    pub async fn ready(&self) -> bool {
        self.sender.send(ControllerSignal::Ready).await.is_ok()
    }

    /// Forward one value notification.
    ///
    /// Returns `false` once the receiving scheduler is gone.
    pub async fn value_updated(&self, event: DeviceEvent) -> bool {
        self.sender
            .send(ControllerSignal::ValueUpdated(event))
            .await
            .is_ok()
    }
}

/// A device controller integration pushing signals into the scheduler.
pub trait ControllerFeed {
    /// Start pushing signals into `sink` in the background and return.
    ///
    /// The background work ends on its own once the sink is closed.
    fn start(
        &self,
        sink: ControllerSink,
    ) -> impl Future<Output = Result<(), ScriptHubError>> + Send;
}
