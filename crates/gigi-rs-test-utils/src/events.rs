use gigi_rs_protocol::{EventMsg, EventPayload, EventSink};
use parking_lot::Mutex;

/// Event sink that records every emitted event for assertions.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<EventMsg>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventMsg> {
        self.events.lock().clone()
    }

    pub fn payloads(&self) -> Vec<EventPayload> {
        self.events
            .lock()
            .iter()
            .map(|event| event.payload.clone())
            .collect()
    }

    pub fn contains(&self, payload: &EventPayload) -> bool {
        self.events
            .lock()
            .iter()
            .any(|event| &event.payload == payload)
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: EventMsg) {
        self.events.lock().push(event);
    }
}
