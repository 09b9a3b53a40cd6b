use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::DeviceKind;
use crate::error::HardwareError;

/// Events device controllers emit to application code
///
/// This is the only boundary the application observes: readiness, failures,
/// and device payloads all arrive here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeviceEvent {
    /// Controller completed its open sequence and is usable
    Ready {
        device: DeviceKind,
        timestamp: DateTime<Utc>,
    },

    /// A failure was observed (open, link I/O, or device-reported)
    Error {
        device: DeviceKind,
        message: String,
        code: Option<u8>,
        timestamp: DateTime<Utc>,
    },

    /// Gate position confirmed by a device acknowledgement
    StateChanged {
        is_open: bool,
        timestamp: DateTime<Utc>,
    },

    /// One complete barcode line was decoded
    Scan {
        barcode: String,
        timestamp: DateTime<Utc>,
    },

    /// Debounced trigger input became active
    Trigger { timestamp: DateTime<Utc> },

    /// One camera acquisition completed
    Capture {
        data: Bytes,
        timestamp: DateTime<Utc>,
    },

    /// One streamed camera frame
    Frame {
        data: Bytes,
        timestamp: DateTime<Utc>,
    },

    /// Inbound bytes with no protocol meaning, surfaced for diagnostics
    Data {
        device: DeviceKind,
        bytes: Bytes,
        timestamp: DateTime<Utc>,
    },
}

impl DeviceEvent {
    /// Create a Ready event
    pub fn ready(device: DeviceKind) -> Self {
        Self::Ready {
            device,
            timestamp: Utc::now(),
        }
    }

    /// Create an Error event carrying the failure envelope
    pub fn error(err: &HardwareError) -> Self {
        Self::Error {
            device: err.device(),
            message: err.to_string(),
            code: err.code(),
            timestamp: Utc::now(),
        }
    }

    /// Create a StateChanged event
    pub fn state_changed(is_open: bool) -> Self {
        Self::StateChanged {
            is_open,
            timestamp: Utc::now(),
        }
    }

    /// Create a Scan event
    pub fn scan(barcode: impl Into<String>) -> Self {
        Self::Scan {
            barcode: barcode.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a Trigger event
    pub fn trigger() -> Self {
        Self::Trigger {
            timestamp: Utc::now(),
        }
    }

    /// Create a Capture event
    pub fn capture(data: Bytes) -> Self {
        Self::Capture {
            data,
            timestamp: Utc::now(),
        }
    }

    /// Create a Frame event
    pub fn frame(data: Bytes) -> Self {
        Self::Frame {
            data,
            timestamp: Utc::now(),
        }
    }

    /// Create a Data event
    pub fn data(device: DeviceKind, bytes: Bytes) -> Self {
        Self::Data {
            device,
            bytes,
            timestamp: Utc::now(),
        }
    }

    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Ready { timestamp, .. } => *timestamp,
            Self::Error { timestamp, .. } => *timestamp,
            Self::StateChanged { timestamp, .. } => *timestamp,
            Self::Scan { timestamp, .. } => *timestamp,
            Self::Trigger { timestamp } => *timestamp,
            Self::Capture { timestamp, .. } => *timestamp,
            Self::Frame { timestamp, .. } => *timestamp,
            Self::Data { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &str {
        match self {
            Self::Ready { .. } => "Ready",
            Self::Error { .. } => "Error",
            Self::StateChanged { .. } => "StateChanged",
            Self::Scan { .. } => "Scan",
            Self::Trigger { .. } => "Trigger",
            Self::Capture { .. } => "Capture",
            Self::Frame { .. } => "Frame",
            Self::Data { .. } => "Data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_event() {
        let event = DeviceEvent::ready(DeviceKind::Gate);

        assert_eq!(event.event_type(), "Ready");
        match event {
            DeviceEvent::Ready { device, .. } => {
                assert_eq!(device, DeviceKind::Gate);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_error_event_carries_envelope() {
        let err = HardwareError::protocol(DeviceKind::Gate, "gate reported failure", Some(0x20));
        let event = DeviceEvent::error(&err);

        assert_eq!(event.event_type(), "Error");
        match event {
            DeviceEvent::Error {
                device,
                message,
                code,
                ..
            } => {
                assert_eq!(device, DeviceKind::Gate);
                assert!(message.contains("gate reported failure"));
                assert_eq!(code, Some(0x20));
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_scan_event() {
        let event = DeviceEvent::scan("ABC123");

        assert_eq!(event.event_type(), "Scan");
        match event {
            DeviceEvent::Scan { barcode, .. } => {
                assert_eq!(barcode, "ABC123");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_state_changed_event() {
        let event = DeviceEvent::state_changed(true);

        assert_eq!(event.event_type(), "StateChanged");
        match event {
            DeviceEvent::StateChanged { is_open, .. } => {
                assert!(is_open);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_event_serialization() {
        let event = DeviceEvent::scan("P-000123");

        let json_str = serde_json::to_string(&event).unwrap();
        assert!(json_str.contains("\"type\":\"Scan\""));

        let deserialized: DeviceEvent = serde_json::from_str(&json_str).unwrap();
        assert_eq!(deserialized.event_type(), "Scan");
    }
}
