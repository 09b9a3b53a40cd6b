use async_trait::async_trait;
use bytes::Bytes;

use super::connection_state::ConnectionState;
use crate::error::HardwareError;

/// Device link trait that transport implementations must provide
///
/// A link exclusively owns one physical connection and is owned by exactly
/// one controller; it is never shared.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// Open the underlying connection
    ///
    /// Opening while already Ready is a no-op.
    async fn open(&mut self) -> Result<(), HardwareError>;

    /// Write raw bytes to the device
    ///
    /// Fails with NotInitialized unless the link is Ready.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), HardwareError>;

    /// Read the next inbound chunk
    ///
    /// Returns None on a quiet interval (read timeout), not on EOF.
    async fn read_chunk(&mut self) -> Result<Option<Bytes>, HardwareError>;

    /// Close the connection; idempotent
    async fn close(&mut self) -> Result<(), HardwareError>;

    /// Get current link state
    fn state(&self) -> ConnectionState;

    /// Check if currently usable for I/O
    fn is_ready(&self) -> bool;

    /// Get transport identifier
    fn transport(&self) -> &str;
}
