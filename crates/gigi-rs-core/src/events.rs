//! Broadcast event bus connecting the engine to rendering layers.

use gigi_rs_protocol::{EventMsg, EventSink};
use log::debug;
use tokio::sync::broadcast;

/// Broadcast-backed event bus for engine state-change events.
///
/// The engine emits; any number of rendering layers subscribe. Slow
/// subscribers lag and drop events rather than blocking the engine.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<EventMsg>,
}

impl EventBus {
    /// Create a new event bus with the given channel buffer size.
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        debug!("event bus initialized (buffer={})", buffer);
        Self { sender }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EventMsg> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for EventBus {
    /// Emit an event into the broadcast channel.
    fn emit(&self, event: EventMsg) {
        let _ = self.sender.send(event);
    }
}
