use crate::device::DeviceKind;
use thiserror::Error;

/// Hardware-level errors
///
/// Every variant names the originating device so observers can route a
/// failure without parsing the message text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HardwareError {
    #[error("{device} link not initialized")]
    NotInitialized { device: DeviceKind },

    #[error("{device} I/O failure: {message}")]
    Io { device: DeviceKind, message: String },

    #[error("{device} protocol fault: {message}")]
    Protocol {
        device: DeviceKind,
        message: String,
        code: Option<u8>,
    },

    #[error("{device} unavailable: {message}")]
    Unavailable { device: DeviceKind, message: String },

    #[error("invalid {device} configuration: {message}")]
    InvalidConfig { device: DeviceKind, message: String },
}

impl HardwareError {
    pub fn not_initialized(device: DeviceKind) -> Self {
        Self::NotInitialized { device }
    }

    pub fn io(device: DeviceKind, err: impl std::fmt::Display) -> Self {
        Self::Io {
            device,
            message: err.to_string(),
        }
    }

    pub fn protocol(device: DeviceKind, message: impl Into<String>, code: Option<u8>) -> Self {
        Self::Protocol {
            device,
            message: message.into(),
            code,
        }
    }

    pub fn unavailable(device: DeviceKind, err: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            device,
            message: err.to_string(),
        }
    }

    pub fn invalid_config(device: DeviceKind, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            device,
            message: message.into(),
        }
    }

    /// Originating device for this error
    pub fn device(&self) -> DeviceKind {
        match self {
            Self::NotInitialized { device }
            | Self::Io { device, .. }
            | Self::Protocol { device, .. }
            | Self::Unavailable { device, .. }
            | Self::InvalidConfig { device, .. } => *device,
        }
    }

    /// Machine-readable code, when the device reported one
    pub fn code(&self) -> Option<u8> {
        match self {
            Self::Protocol { code, .. } => *code,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HardwareError>;
