use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use domain::trigger::{DebounceSettings, TriggerInput};
use domain::{DeviceEvent, DeviceKind};

use crate::events::EventBus;

/// Polls a digital input and debounces level changes.
///
/// A raw sample is active when it differs from the configured idle polarity.
/// A change of the debounced state is accepted only when the debounce
/// window since the last accepted change has passed; accepted activations
/// emit a `Trigger` event, deactivations are recorded silently.
pub struct TriggerMonitor {
    active: Arc<AtomicBool>,
    events: EventBus,
    cancel_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TriggerMonitor {
    /// Start polling immediately.
    pub fn new(input: Box<dyn TriggerInput>, settings: DebounceSettings) -> Self {
        let active = Arc::new(AtomicBool::new(false));
        let events = EventBus::new();
        let cancel_token = CancellationToken::new();

        let poller = TriggerPoller {
            input,
            settings,
            active: active.clone(),
            events: events.clone(),
            cancel_token: cancel_token.clone(),
        };
        let task = tokio::spawn(poller.run());

        Self {
            active,
            events,
            cancel_token,
            task: Mutex::new(Some(task)),
        }
    }

    /// Current debounced state of the input.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Stop the polling loop. Idempotent; no events are emitted after this
    /// returns.
    pub async fn dispose(&self) {
        self.cancel_token.cancel();
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!(device = %DeviceKind::Trigger, error = %e, "Trigger poller ended abnormally");
            }
        }
    }
}

impl Drop for TriggerMonitor {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

struct TriggerPoller {
    input: Box<dyn TriggerInput>,
    settings: DebounceSettings,
    active: Arc<AtomicBool>,
    events: EventBus,
    cancel_token: CancellationToken,
}

impl TriggerPoller {
    async fn run(mut self) {
        let debounce = Duration::from_millis(self.settings.debounce_ms);
        let mut ticker = interval(Duration::from_millis(self.settings.poll_interval_ms));
        // The first observed change is always accepted.
        let mut last_accepted_change: Option<Instant> = None;

        info!(
            device = %DeviceKind::Trigger,
            poll_ms = self.settings.poll_interval_ms,
            debounce_ms = self.settings.debounce_ms,
            active_low = self.settings.active_low,
            "Trigger monitor started"
        );

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!(device = %DeviceKind::Trigger, "Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    let raw = match self.input.sample().await {
                        Ok(raw) => raw,
                        Err(e) => {
                            warn!(device = %DeviceKind::Trigger, error = %e, "Trigger sample failed");
                            self.events.emit(DeviceEvent::error(&e));
                            continue;
                        }
                    };

                    let level = raw != self.settings.active_low;
                    if level == self.active.load(Ordering::SeqCst) {
                        continue;
                    }
                    let settled = match last_accepted_change {
                        Some(at) => at.elapsed() >= debounce,
                        None => true,
                    };
                    if !settled {
                        // Bounce inside the debounce window.
                        continue;
                    }

                    last_accepted_change = Some(Instant::now());
                    self.active.store(level, Ordering::SeqCst);
                    if level {
                        info!(device = %DeviceKind::Trigger, "Trigger activated");
                        self.events.emit(DeviceEvent::trigger());
                    } else {
                        debug!(device = %DeviceKind::Trigger, "Trigger released");
                    }
                }
            }
        }
    }
}
