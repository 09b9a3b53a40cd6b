use domain::DeviceEvent;
use tokio::sync::broadcast;

/// Capacity of each controller's event channel. A subscriber that falls
/// further behind than this lags and loses the oldest events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Broadcast fan-out for device events.
///
/// Every controller owns one bus; `subscribe` hands out independent
/// receivers that each see the full event stream from that point on.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DeviceEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: DeviceEvent) {
        // A send error only means nobody is subscribed right now.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
