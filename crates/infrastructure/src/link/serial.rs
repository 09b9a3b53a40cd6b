use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use domain::link::{ConnectionState, DeviceLink};
use domain::{DeviceKind, HardwareError};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Serial link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialSettings {
    pub path: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_parity")]
    pub parity: String, // "none", "even", "odd"
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_baud_rate() -> u32 {
    9600
}
fn default_data_bits() -> u8 {
    8
}
fn default_parity() -> String {
    "none".to_string()
}
fn default_stop_bits() -> u8 {
    1
}
fn default_read_timeout_ms() -> u64 {
    1000
}

impl SerialSettings {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: default_parity(),
            stop_bits: default_stop_bits(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }

    fn to_parity(&self, device: DeviceKind) -> Result<tokio_serial::Parity, HardwareError> {
        match self.parity.to_ascii_lowercase().as_str() {
            "none" => Ok(tokio_serial::Parity::None),
            "even" => Ok(tokio_serial::Parity::Even),
            "odd" => Ok(tokio_serial::Parity::Odd),
            _ => Err(HardwareError::invalid_config(
                device,
                format!("invalid parity: {}", self.parity),
            )),
        }
    }

    fn to_stop_bits(&self, device: DeviceKind) -> Result<tokio_serial::StopBits, HardwareError> {
        match self.stop_bits {
            1 => Ok(tokio_serial::StopBits::One),
            2 => Ok(tokio_serial::StopBits::Two),
            _ => Err(HardwareError::invalid_config(
                device,
                format!("invalid stop bits: {}", self.stop_bits),
            )),
        }
    }

    fn to_data_bits(&self, device: DeviceKind) -> Result<tokio_serial::DataBits, HardwareError> {
        match self.data_bits {
            5 => Ok(tokio_serial::DataBits::Five),
            6 => Ok(tokio_serial::DataBits::Six),
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            _ => Err(HardwareError::invalid_config(
                device,
                format!("invalid data bits: {}", self.data_bits),
            )),
        }
    }
}

/// Serial device link
/// The stream sits behind Arc<Mutex<>> to keep the link Send + Sync as
/// required by DeviceLink.
pub struct SerialLink {
    device: DeviceKind,
    settings: SerialSettings,
    port: Option<Arc<Mutex<SerialStream>>>,
    state: ConnectionState,
}

impl SerialLink {
    pub fn new(device: DeviceKind, settings: SerialSettings) -> Self {
        Self {
            device,
            settings,
            port: None,
            state: ConnectionState::default(),
        }
    }
}

#[async_trait]
impl DeviceLink for SerialLink {
    async fn open(&mut self) -> Result<(), HardwareError> {
        if self.state.is_ready() {
            return Ok(());
        }
        // Validate settings before touching the state machine so a config
        // error does not leave the link half opened.
        let data_bits = self.settings.to_data_bits(self.device)?;
        let parity = self.settings.to_parity(self.device)?;
        let stop_bits = self.settings.to_stop_bits(self.device)?;

        self.state = self
            .state
            .to_opening()
            .map_err(|e| HardwareError::unavailable(self.device, e))?;

        // Normalize port name for Windows (e.g., COM7 -> \\.\COM7)
        // This is often required for reliable access to serial ports on Windows.
        let port_name = if cfg!(target_os = "windows")
            && !self.settings.path.to_uppercase().starts_with(r"\\.\")
        {
            format!(r"\\.\{}", self.settings.path)
        } else {
            self.settings.path.clone()
        };

        tracing::debug!(
            device = %self.device,
            port = %port_name,
            baud_rate = self.settings.baud_rate,
            "Opening serial port"
        );

        let port = tokio_serial::new(&port_name, self.settings.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(Duration::from_millis(self.settings.read_timeout_ms))
            .open_native_async()
            .map_err(|e| {
                // Downgraded to WARN to avoid spamming error logs during retries
                tracing::warn!(device = %self.device, port = %port_name, error = %e, "Failed to open serial port");
                self.state = self.state.to_faulted();
                HardwareError::io(
                    self.device,
                    format!("failed to open serial port {}: {}", port_name, e),
                )
            })?;

        self.port = Some(Arc::new(Mutex::new(port)));
        self.state = self
            .state
            .to_ready()
            .map_err(|e| HardwareError::unavailable(self.device, e))?;

        tracing::debug!(device = %self.device, port = %self.settings.path, "Serial port opened successfully");
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), HardwareError> {
        if !self.state.is_ready() {
            return Err(HardwareError::not_initialized(self.device));
        }
        let port_arc = self
            .port
            .as_ref()
            .ok_or_else(|| HardwareError::not_initialized(self.device))?;

        let mut port = port_arc.lock().await;

        // A failed write rejects this call only; the link state is untouched
        // so the controller stays usable.
        port.write_all(bytes)
            .await
            .map_err(|e| HardwareError::io(self.device, format!("write error: {}", e)))?;

        port.flush()
            .await
            .map_err(|e| HardwareError::io(self.device, format!("flush error: {}", e)))?;

        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Option<Bytes>, HardwareError> {
        if !self.state.is_ready() {
            return Err(HardwareError::not_initialized(self.device));
        }
        let port_arc = self
            .port
            .as_ref()
            .ok_or_else(|| HardwareError::not_initialized(self.device))?;

        let mut port = port_arc.lock().await; // Lock ensures exclusive access
        let mut buffer = vec![0u8; 1024];

        let timeout_duration = Duration::from_millis(self.settings.read_timeout_ms);

        match tokio::time::timeout(timeout_duration, port.read(&mut buffer)).await {
            Ok(read_result) => match read_result {
                Ok(0) => {
                    // unexpected EOF or empty read
                    Ok(None)
                }
                Ok(n) => Ok(Some(Bytes::copy_from_slice(&buffer[..n]))),
                Err(e) => {
                    self.state = self.state.to_faulted();
                    Err(HardwareError::io(
                        self.device,
                        format!("read error: {}", e),
                    ))
                }
            },
            Err(_) => {
                // Timeout elapsed: quiet interval, the link is still valid
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> Result<(), HardwareError> {
        if let Some(port_arc) = self.port.take() {
            let mut port = port_arc.lock().await;
            if let Err(e) = port.shutdown().await {
                tracing::warn!(device = %self.device, error = %e, "Error shutting down serial port");
            }
            tracing::info!(device = %self.device, port = %self.settings.path, "Serial port closed");
        }
        self.state = self.state.to_closed();
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    fn transport(&self) -> &str {
        "serial"
    }
}
