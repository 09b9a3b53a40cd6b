use std::path::PathBuf;

use async_trait::async_trait;
use domain::trigger::TriggerInput;
use domain::{DeviceKind, HardwareError};
use serde::{Deserialize, Serialize};

/// GPIO input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpioSettings {
    /// Value file of an exported pin, e.g. /sys/class/gpio/gpio17/value
    pub value_path: String,
}

/// Digital input backed by a sysfs GPIO value file
///
/// The pin must already be exported and configured as an input; wiring-level
/// setup is outside this subsystem.
pub struct GpioInput {
    path: PathBuf,
}

impl GpioInput {
    pub fn new(settings: &GpioSettings) -> Self {
        Self {
            path: PathBuf::from(&settings.value_path),
        }
    }
}

#[async_trait]
impl TriggerInput for GpioInput {
    async fn sample(&mut self) -> Result<bool, HardwareError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            HardwareError::io(
                DeviceKind::Trigger,
                format!("read {}: {}", self.path.display(), e),
            )
        })?;

        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(HardwareError::protocol(
                DeviceKind::Trigger,
                format!("unexpected gpio value: {:?}", other),
                None,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gpio_test_{}_{}", std::process::id(), name));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_sample_reads_levels() {
        let path = scratch_file("level", "1\n");
        let mut input = GpioInput::new(&GpioSettings {
            value_path: path.display().to_string(),
        });

        assert!(input.sample().await.unwrap());

        std::fs::write(&path, "0\n").unwrap();
        assert!(!input.sample().await.unwrap());

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_pin_is_io_error() {
        let mut input = GpioInput::new(&GpioSettings {
            value_path: "/nonexistent/gpio999/value".to_string(),
        });

        assert!(matches!(
            input.sample().await,
            Err(HardwareError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_garbage_value_is_protocol_error() {
        let path = scratch_file("garbage", "banana\n");
        let mut input = GpioInput::new(&GpioSettings {
            value_path: path.display().to_string(),
        });

        assert!(matches!(
            input.sample().await,
            Err(HardwareError::Protocol { .. })
        ));

        std::fs::remove_file(&path).unwrap();
    }
}
