//! Domain layer - Pure device contracts with no external dependencies
//!
//! This crate contains:
//! - Device identity and connection state machine
//! - The DeviceLink, CameraDevice and TriggerInput traits
//! - Per-device wire codecs (gate opcodes, ESC/POS, scanner lines)
//! - Device events and the hardware error taxonomy
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Protocol rules enforced at domain level
//! - Testable in isolation

pub mod camera;
pub mod codec;
pub mod device;
pub mod error;
pub mod event;
pub mod link;
pub mod trigger;

// Re-export commonly used types
pub use camera::{CameraDevice, CaptureOptions};
pub use device::DeviceKind;
pub use error::HardwareError;
pub use event::DeviceEvent;
pub use link::{ConnectionState, DeviceLink};
pub use trigger::{DebounceSettings, TriggerInput};
