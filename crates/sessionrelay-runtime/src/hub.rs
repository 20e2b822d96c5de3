//! In-process event fan-out (C5). `publish` is non-blocking and lossy: if
//! the hub's own ingress queue (capacity 256) is full, the event is dropped
//! with a warning rather than backing up the publisher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;

use sessionrelay_types::BridgeEvent;

const INGRESS_CAPACITY: usize = 256;

/// A hub-registered event sink. `send` returning an error is treated as a
/// permanent failure: the subscriber is quarantined (removed) on the spot.
pub trait Subscriber: Send + Sync {
    fn send(&self, event: BridgeEvent) -> std::result::Result<(), ()>;
}

impl<T: Subscriber + ?Sized> Subscriber for Arc<T> {
    fn send(&self, event: BridgeEvent) -> std::result::Result<(), ()> {
        (**self).send(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

enum Command {
    Register(SubscriberId, Box<dyn Subscriber>),
    Unregister(SubscriberId),
    Publish(BridgeEvent),
}

pub struct EventHub {
    tx: SyncSender<Command>,
    _dispatcher: JoinHandle<()>,
    next_id: AtomicU64,
}

impl EventHub {
    pub fn new() -> Self {
        Self::with_capacity(INGRESS_CAPACITY)
    }

    /// Same as [`new`](Self::new), but with the ingress queue sized from a
    /// [`crate::RuntimeConfig`] instead of the built-in default.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = sync_channel(capacity);
        let dispatcher = std::thread::Builder::new()
            .name("event-hub".to_string())
            .spawn(move || dispatch_loop(rx))
            .expect("failed to spawn event hub dispatcher");
        EventHub {
            tx,
            _dispatcher: dispatcher,
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers `subscriber` and returns the id future `unregister` calls
    /// use. Blocking (registration is rare and never lossy, unlike publish).
    pub fn register(&self, subscriber: impl Subscriber + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let _ = self.tx.send(Command::Register(id, Box::new(subscriber)));
        id
    }

    /// Non-blocking; unregistering an id that is already gone is a no-op.
    pub fn unregister(&self, id: SubscriberId) {
        let _ = self.tx.try_send(Command::Unregister(id));
    }

    pub fn publish(&self, event: BridgeEvent) {
        match self.tx.try_send(Command::Publish(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                sessionrelay_core::log::warn("hub", "ingress buffer full, dropping event");
            }
            Err(TrySendError::Disconnected(_)) => {
                sessionrelay_core::log::warn("hub", "dispatcher is gone, dropping event");
            }
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch_loop(rx: Receiver<Command>) {
    let mut subscribers: HashMap<SubscriberId, Box<dyn Subscriber>> = HashMap::new();
    while let Ok(command) = rx.recv() {
        match command {
            Command::Register(id, subscriber) => {
                subscribers.insert(id, subscriber);
            }
            Command::Unregister(id) => {
                subscribers.remove(&id);
            }
            Command::Publish(event) => {
                // Each subscriber gets its own send attempt; one failing
                // send must never block or skip the others.
                let failed: Vec<SubscriberId> = subscribers
                    .iter()
                    .filter_map(|(id, subscriber)| subscriber.send(event.clone()).err().map(|_| *id))
                    .collect();
                for id in failed {
                    subscribers.remove(&id);
                    sessionrelay_core::log::warn("hub", "quarantined a subscriber after a failed send");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use sessionrelay_types::{EventPayload, HeartbeatPayload};

    struct Recording(Arc<Mutex<Vec<BridgeEvent>>>);

    impl Subscriber for Recording {
        fn send(&self, event: BridgeEvent) -> std::result::Result<(), ()> {
            self.0.lock().unwrap().push(event);
            Ok(())
        }
    }

    struct AlwaysFails;

    impl Subscriber for AlwaysFails {
        fn send(&self, _event: BridgeEvent) -> std::result::Result<(), ()> {
            Err(())
        }
    }

    fn heartbeat() -> BridgeEvent {
        BridgeEvent::new(EventPayload::Heartbeat(HeartbeatPayload::default()))
    }

    #[test]
    fn registered_subscriber_receives_published_events() {
        let hub = EventHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        hub.register(Recording(log.clone()));
        hub.publish(heartbeat());
        hub.publish(heartbeat());
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn unregistered_subscriber_stops_receiving() {
        let hub = EventHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = hub.register(Recording(log.clone()));
        hub.publish(heartbeat());
        hub.unregister(id);
        std::thread::sleep(std::time::Duration::from_millis(50));
        hub.publish(heartbeat());
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn failing_subscriber_is_quarantined_without_blocking_others() {
        let hub = EventHub::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        hub.register(AlwaysFails);
        hub.register(Recording(log.clone()));
        hub.publish(heartbeat());
        hub.publish(heartbeat());
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(log.lock().unwrap().len(), 2);
    }
}
