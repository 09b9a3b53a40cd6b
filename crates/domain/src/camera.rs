use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::HardwareError;

/// Options applied to a single acquisition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Overlay the acquisition time on the frame, when the device supports it
    #[serde(default)]
    pub timestamp: bool,
    /// Clockwise rotation in degrees
    #[serde(default)]
    pub rotation: u16,
}

/// Camera device trait that capture backends must provide
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Prepare the device for acquisitions
    async fn init(&mut self) -> Result<(), HardwareError>;

    /// Acquire one encoded image
    async fn capture(&mut self, options: &CaptureOptions) -> Result<Bytes, HardwareError>;

    /// Release the device; idempotent
    async fn shutdown(&mut self) -> Result<(), HardwareError>;

    /// Check if the device accepted init
    fn is_ready(&self) -> bool;
}
