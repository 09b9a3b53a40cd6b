use std::time::Duration;

use application::trigger::TriggerMonitor;
use domain::trigger::DebounceSettings;
use domain::DeviceEvent;
use infrastructure::trigger::MockTriggerInput;
use tokio::sync::broadcast;
use tokio::time::{advance, pause};

fn drain_triggers(rx: &mut broadcast::Receiver<DeviceEvent>) -> usize {
    let mut count = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, DeviceEvent::Trigger { .. }) {
            count += 1;
        }
    }
    count
}

fn settings(debounce_ms: u64) -> DebounceSettings {
    DebounceSettings {
        poll_interval_ms: 100,
        debounce_ms,
        active_low: false,
    }
}

#[tokio::test]
async fn test_bounces_inside_debounce_window_are_ignored() {
    pause();
    let (input, handle) = MockTriggerInput::new();
    let monitor = TriggerMonitor::new(Box::new(input), settings(1000));
    let mut events = monitor.subscribe();

    handle.set_level(true);
    advance(Duration::from_millis(150)).await;
    assert_eq!(drain_triggers(&mut events), 1);
    assert!(monitor.is_active());

    // Mechanical bounce: off and back on inside the window
    handle.set_level(false);
    advance(Duration::from_millis(200)).await;
    handle.set_level(true);
    advance(Duration::from_millis(200)).await;
    assert_eq!(drain_triggers(&mut events), 0);
    assert!(monitor.is_active());

    monitor.dispose().await;
}

#[tokio::test]
async fn test_release_is_silent_and_rearms_after_window() {
    pause();
    let (input, handle) = MockTriggerInput::new();
    let monitor = TriggerMonitor::new(Box::new(input), settings(1000));
    let mut events = monitor.subscribe();

    handle.set_level(true);
    advance(Duration::from_millis(150)).await;
    assert_eq!(drain_triggers(&mut events), 1);

    // Hold past the window, then release
    advance(Duration::from_millis(1000)).await;
    handle.set_level(false);
    advance(Duration::from_millis(150)).await;
    assert!(!monitor.is_active());
    assert_eq!(drain_triggers(&mut events), 0, "release must not trigger");

    // The next activation fires again once its own window has passed
    handle.set_level(true);
    advance(Duration::from_millis(1100)).await;
    assert_eq!(drain_triggers(&mut events), 1);
    assert!(monitor.is_active());

    monitor.dispose().await;
}

#[tokio::test]
async fn test_active_low_inverts_the_raw_level() {
    pause();
    let (input, handle) = MockTriggerInput::new();
    // Line idles high on an active low input
    handle.set_level(true);
    let monitor = TriggerMonitor::new(
        Box::new(input),
        DebounceSettings {
            poll_interval_ms: 100,
            debounce_ms: 300,
            active_low: true,
        },
    );
    let mut events = monitor.subscribe();

    advance(Duration::from_millis(150)).await;
    assert!(!monitor.is_active());
    assert_eq!(drain_triggers(&mut events), 0);

    // Pulling the line low means a vehicle arrived
    handle.set_level(false);
    advance(Duration::from_millis(400)).await;
    assert!(monitor.is_active());
    assert_eq!(drain_triggers(&mut events), 1);

    monitor.dispose().await;
}

#[tokio::test]
async fn test_sample_errors_emit_and_polling_continues() {
    pause();
    let (input, handle) = MockTriggerInput::new();
    handle.set_fail(true);
    let monitor = TriggerMonitor::new(Box::new(input), settings(300));
    let mut events = monitor.subscribe();

    advance(Duration::from_millis(250)).await;
    let mut errors = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, DeviceEvent::Error { .. }) {
            errors += 1;
        }
    }
    assert!(errors >= 2, "each failed sample reports, got {errors}");

    handle.set_fail(false);
    handle.set_level(true);
    advance(Duration::from_millis(150)).await;
    assert_eq!(drain_triggers(&mut events), 1);

    monitor.dispose().await;
}

#[tokio::test]
async fn test_dispose_stops_polling() {
    pause();
    let (input, handle) = MockTriggerInput::new();
    let monitor = TriggerMonitor::new(Box::new(input), settings(1000));
    let mut events = monitor.subscribe();

    handle.set_level(true);
    advance(Duration::from_millis(150)).await;
    assert_eq!(drain_triggers(&mut events), 1);

    monitor.dispose().await;
    monitor.dispose().await;

    handle.set_level(false);
    advance(Duration::from_secs(5)).await;
    assert!(monitor.is_active(), "state is frozen at disposal");
    assert_eq!(drain_triggers(&mut events), 0);
}
