//! A recording `Subscriber`: pushes every event it receives into a shared
//! log, for tests that assert on hub/filter/registry behavior directly
//! rather than through a real transport.

use std::sync::{Arc, Mutex};

use sessionrelay_runtime::Subscriber;
use sessionrelay_types::BridgeEvent;

#[derive(Clone, Default)]
pub struct RecordingSubscriber {
    events: Arc<Mutex<Vec<BridgeEvent>>>,
}

impl RecordingSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BridgeEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Subscriber for RecordingSubscriber {
    fn send(&self, event: BridgeEvent) -> std::result::Result<(), ()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionrelay_types::{EventPayload, HeartbeatPayload};

    #[test]
    fn records_every_sent_event_in_order() {
        let recorder = RecordingSubscriber::new();
        recorder.send(BridgeEvent::new(EventPayload::Heartbeat(HeartbeatPayload::default()))).unwrap();
        recorder.send(BridgeEvent::new(EventPayload::Heartbeat(HeartbeatPayload::default()))).unwrap();
        assert_eq!(recorder.len(), 2);
    }
}
