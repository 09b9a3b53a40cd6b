use std::time::Duration;

use application::printer::PrinterController;
use application::ticket::{self, TicketData};
use chrono::{TimeZone, Utc};
use domain::codec::printer::{Alignment, PrintOptions, TextSize};
use domain::{DeviceEvent, DeviceKind, HardwareError};
use infrastructure::link::MockLink;
use tokio::sync::broadcast;
use tokio::time::timeout;

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

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

#[tokio::test]
async fn test_print_writes_formatted_job() {
    let (link, handle) = MockLink::new(DeviceKind::Printer);
    let printer = PrinterController::new(Box::new(link));

    let options = PrintOptions {
        align: Some(Alignment::Center),
        bold: true,
        ..PrintOptions::default()
    };
    printer.print("LANE 1 OPEN", options).await.unwrap();

    let written = handle.written().await;
    // Reset at both ends of the job
    assert_eq!(&written[..2], &[0x1B, 0x40]);
    assert_eq!(&written[written.len() - 2..], &[0x1B, 0x40]);
    assert!(find_subsequence(&written, &[0x1B, 0x61, 0x01]).is_some());
    assert!(find_subsequence(&written, &[0x1B, 0x45, 0x01]).is_some());
    assert!(find_subsequence(&written, b"LANE 1 OPEN").is_some());
    // Underline was not requested
    assert!(find_subsequence(&written, &[0x1B, 0x2D, 0x01]).is_none());

    printer.dispose().await;
}

#[tokio::test]
async fn test_barcode_job_byte_shape() {
    let (link, handle) = MockLink::new(DeviceKind::Printer);
    let printer = PrinterController::new(Box::new(link));

    printer.print_barcode("12345", 80).await.unwrap();

    let written = handle.written().await;
    let height = find_subsequence(&written, &[0x1D, 0x68, 80]).unwrap();
    let width = find_subsequence(&written, &[0x1D, 0x77, 0x02]).unwrap();
    assert!(find_subsequence(&written, &[0x1D, 0x48, 0x02]).is_some());
    assert!(find_subsequence(&written, &[0x1D, 0x66, 0x00]).is_some());

    // Setup bytes come before the print command, data is null terminated
    let print_idx = find_subsequence(&written, &[0x1D, 0x6B, 0x04]).unwrap();
    assert!(height < print_idx);
    assert!(width < print_idx);
    let data_idx = find_subsequence(&written, b"12345").unwrap();
    assert_eq!(data_idx, print_idx + 3);
    assert_eq!(written[data_idx + 5], 0x00);

    printer.dispose().await;
}

#[tokio::test]
async fn test_cut_and_feed_commands() {
    let (link, handle) = MockLink::new(DeviceKind::Printer);
    let printer = PrinterController::new(Box::new(link));

    printer.feed(4).await.unwrap();
    printer.cut().await.unwrap();
    assert_eq!(
        handle.written().await,
        vec![0x1B, 0x64, 0x04, 0x1D, 0x56, 0x00]
    );

    printer.dispose().await;
}

#[tokio::test]
async fn test_jobs_rejected_when_link_not_ready() {
    let (link, handle) = MockLink::failing_open(DeviceKind::Printer);
    let printer = PrinterController::new(Box::new(link));
    let mut events = printer.subscribe();

    let event = wait_for_event(&mut events, |e| matches!(e, DeviceEvent::Error { .. })).await;
    match event {
        DeviceEvent::Error { device, .. } => assert_eq!(device, DeviceKind::Printer),
        _ => unreachable!(),
    }

    let err = printer
        .print("x", PrintOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, HardwareError::not_initialized(DeviceKind::Printer));
    assert!(handle.written().await.is_empty());

    printer.dispose().await;
}

#[tokio::test]
async fn test_write_failure_rejects_job_and_link_stays_usable() {
    let (link, handle) = MockLink::new(DeviceKind::Printer);
    let printer = PrinterController::new(Box::new(link));
    let mut events = printer.subscribe();

    handle.set_fail_writes(true);
    let err = printer.cut().await.unwrap_err();
    assert!(matches!(err, HardwareError::Io { .. }));
    wait_for_event(&mut events, |e| matches!(e, DeviceEvent::Error { .. })).await;

    handle.set_fail_writes(false);
    printer.cut().await.unwrap();
    assert_eq!(handle.written().await, vec![0x1D, 0x56, 0x00]);

    printer.dispose().await;
}

#[tokio::test]
async fn test_entry_ticket_program() {
    let (link, handle) = MockLink::new(DeviceKind::Printer);
    let printer = PrinterController::new(Box::new(link));

    let ticket = TicketData {
        barcode: "T-000123".to_string(),
        plate_number: "B 1234 XYZ".to_string(),
        vehicle_type: "car".to_string(),
        entry_time: Utc.with_ymd_and_hms(2024, 5, 14, 8, 30, 0).unwrap(),
        operator_id: Some("op-7".to_string()),
    };
    ticket::print_entry_ticket(&printer, &ticket).await.unwrap();

    let written = handle.written().await;
    assert!(find_subsequence(&written, b"PARKING TICKET").is_some());
    assert!(find_subsequence(&written, b"Date: 2024-05-14 08:30:00").is_some());
    assert!(find_subsequence(&written, b"Plate: B 1234 XYZ").is_some());
    assert!(find_subsequence(&written, b"Type: car").is_some());
    assert!(find_subsequence(&written, b"Operator: op-7").is_some());

    // Header is centered and double sized
    let header = find_subsequence(&written, b"PARKING TICKET").unwrap();
    assert!(find_subsequence(&written[..header], &[0x1B, 0x61, 0x01]).is_some());
    assert!(find_subsequence(&written[..header], &[0x1B, 0x21, 0x10]).is_some());

    // Barcode carries the ticket id, the job ends with feed and cut
    let barcode = find_subsequence(&written, &[0x1D, 0x6B, 0x04]).unwrap();
    assert!(find_subsequence(&written[barcode..], b"T-000123").is_some());
    let feed = find_subsequence(&written, &[0x1B, 0x64, 0x05]).unwrap();
    let cut = find_subsequence(&written, &[0x1D, 0x56, 0x00]).unwrap();
    assert!(barcode < feed);
    assert!(feed < cut);

    printer.dispose().await;
}

#[tokio::test]
async fn test_text_size_codes() {
    let (link, handle) = MockLink::new(DeviceKind::Printer);
    let printer = PrinterController::new(Box::new(link));

    let options = PrintOptions {
        size: Some(TextSize::Small),
        ..PrintOptions::default()
    };
    printer.print("fine print", options).await.unwrap();
    assert!(find_subsequence(&handle.written().await, &[0x1B, 0x21, 0x01]).is_some());

    printer.dispose().await;
}
