use std::sync::Arc;
use std::time::Duration;

use application::camera::CameraController;
use application::gate::GateController;
use application::manager::DeviceManager;
use application::printer::PrinterController;
use application::scanner::ScannerController;
use application::ticket::TicketData;
use application::trigger::TriggerMonitor;
use chrono::Utc;
use domain::camera::CaptureOptions;
use domain::codec::gate::GateCommandSet;
use domain::codec::printer::PrintOptions;
use domain::trigger::DebounceSettings;
use domain::{DeviceEvent, DeviceKind, HardwareError};
use infrastructure::camera::MockCamera;
use infrastructure::config::{
    CameraBackend, CameraConfig, GateConfig, LaneConfig, PrinterConfig, ScannerConfig,
    TriggerConfig, TriggerSource,
};
use infrastructure::link::MockLink;
use infrastructure::trigger::MockTriggerInput;
use infrastructure::LinkSection;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};

async fn wait_for_event(
    rx: &mut broadcast::Receiver<DeviceEvent>,
    matches: impl Fn(&DeviceEvent) -> bool,
) -> DeviceEvent {
    timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event channel closed: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

fn all_mock_config() -> LaneConfig {
    LaneConfig {
        lane_id: "bench-1".to_string(),
        gate: Some(GateConfig {
            link: LinkSection::Mock,
            commands: GateCommandSet::default(),
        }),
        printer: Some(PrinterConfig {
            link: LinkSection::Mock,
        }),
        scanner: Some(ScannerConfig {
            link: LinkSection::Mock,
            trigger_command: vec![0x1B, 0x74],
            scan_interval_ms: 1000,
            max_consecutive_failures: 10,
        }),
        trigger: Some(TriggerConfig {
            input: TriggerSource::Mock,
            debounce: DebounceSettings::default(),
        }),
        camera: Some(CameraConfig {
            capture: CameraBackend::Mock,
            stream_interval_ms: 100,
            max_consecutive_failures: 10,
        }),
    }
}

#[tokio::test]
async fn test_dispose_is_idempotent_for_every_controller() {
    let (link, _h) = MockLink::new(DeviceKind::Gate);
    let gate = GateController::new(Box::new(link), GateCommandSet::default());
    gate.dispose().await;
    gate.dispose().await;

    let (link, _h) = MockLink::new(DeviceKind::Printer);
    let printer = PrinterController::new(Box::new(link));
    printer.dispose().await;
    printer.dispose().await;

    let (link, _h) = MockLink::new(DeviceKind::Scanner);
    let scanner = ScannerController::new(Box::new(link), vec![0x1B, 0x74], 10);
    scanner.dispose().await;
    scanner.dispose().await;

    let (input, _h) = MockTriggerInput::new();
    let monitor = TriggerMonitor::new(Box::new(input), DebounceSettings::default());
    monitor.dispose().await;
    monitor.dispose().await;

    let (device, _h) = MockCamera::new();
    let camera = CameraController::new(Box::new(device), 10);
    camera.dispose().await;
    camera.dispose().await;
}

#[tokio::test]
async fn test_no_events_after_dispose() {
    let (link, handle) = MockLink::new(DeviceKind::Scanner);
    let scanner = ScannerController::new(Box::new(link), vec![0x1B, 0x74], 10);
    let mut events = scanner.subscribe();

    handle.push_bytes(b"LIVE\r");
    wait_for_event(&mut events, |e| matches!(e, DeviceEvent::Scan { .. })).await;

    scanner.dispose().await;
    while events.try_recv().is_ok() {}

    handle.push_bytes(b"DEAD\r");
    sleep(Duration::from_millis(200)).await;
    assert!(events.try_recv().is_err(), "event emitted after dispose");
}

#[tokio::test]
async fn test_calls_after_dispose_are_rejected() {
    let (link, _h) = MockLink::new(DeviceKind::Gate);
    let gate = GateController::new(Box::new(link), GateCommandSet::default());
    gate.dispose().await;
    let err = gate.open().await.unwrap_err();
    assert!(matches!(err, HardwareError::Unavailable { .. }));
    assert!(gate.status().await.is_err());

    let (link, _h) = MockLink::new(DeviceKind::Printer);
    let printer = PrinterController::new(Box::new(link));
    printer.dispose().await;
    assert!(printer
        .print("too late", PrintOptions::default())
        .await
        .is_err());

    let (device, _h) = MockCamera::new();
    let camera = CameraController::new(Box::new(device), 10);
    camera.dispose().await;
    assert!(camera.capture(CaptureOptions::default()).await.is_err());
}

#[tokio::test]
async fn test_in_flight_call_settles_during_dispose() {
    let (link, _handle) = MockLink::new(DeviceKind::Printer);
    let printer = Arc::new(PrinterController::new(Box::new(link)));

    let worker = printer.clone();
    let job = tokio::spawn(async move {
        worker
            .print("while disposing", PrintOptions::default())
            .await
    });
    printer.dispose().await;

    // The call resolves either way; it must never hang
    let result = timeout(Duration::from_secs(1), job)
        .await
        .expect("print call must settle")
        .unwrap();
    let _ = result;
}

#[tokio::test]
async fn test_manager_builds_all_configured_devices() {
    let manager = DeviceManager::from_config(&all_mock_config()).unwrap();
    assert_eq!(manager.device_count(), 5);
    assert!(manager.gate().is_some());
    assert!(manager.printer().is_some());
    assert!(manager.scanner().is_some());
    assert!(manager.trigger().is_some());
    assert!(manager.camera().is_some());

    manager.dispose_all().await;
    manager.dispose_all().await;

    let err = manager.gate().unwrap().open().await.unwrap_err();
    assert!(matches!(err, HardwareError::Unavailable { .. }));
}

#[tokio::test]
async fn test_manager_skips_unconfigured_devices() {
    let config = LaneConfig {
        lane_id: "exit-2".to_string(),
        gate: None,
        printer: None,
        scanner: None,
        trigger: None,
        camera: None,
    };
    let manager = DeviceManager::from_config(&config).unwrap();
    assert_eq!(manager.device_count(), 0);
    assert!(manager.printer().is_none());

    let ticket = TicketData {
        barcode: "T-1".to_string(),
        plate_number: "B 1 A".to_string(),
        vehicle_type: "car".to_string(),
        entry_time: Utc::now(),
        operator_id: None,
    };
    let err = manager.print_entry_ticket(&ticket).await.unwrap_err();
    assert!(matches!(
        err,
        HardwareError::Unavailable {
            device: DeviceKind::Printer,
            ..
        }
    ));

    manager.dispose_all().await;
}
