//! Run event fan-out over `tokio::sync::broadcast`.
//!
//! The engine publishes lifecycle events while it walks a graph; the CLI and
//! tests subscribe. Events published while nobody is subscribed are dropped.

use nodeflow_types::event::RunEvent;
use tokio::sync::broadcast;

/// Sender side of the run event channel. Clones share the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    /// Publish an event and return how many subscribers it reached.
    pub fn publish(&self, event: RunEvent) -> usize {
        match self.sender.send(event) {
            Ok(delivered) => delivered,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(run_id = %event.run_id(), "no subscribers, run event dropped");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
