use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use domain::camera::{CameraDevice, CaptureOptions};
use domain::{DeviceKind, HardwareError};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

/// Capture backend configuration
///
/// The capture program is invoked once per acquisition with an output file
/// it writes the encoded frame to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default = "default_frames")]
    pub frames: u32,
    /// Warm-up delay in seconds before the frame is taken
    #[serde(default)]
    pub delay: u32,
}

fn default_command() -> String {
    "fswebcam".to_string()
}
fn default_device() -> String {
    "/dev/video0".to_string()
}
fn default_width() -> u32 {
    1280
}
fn default_height() -> u32 {
    720
}
fn default_quality() -> u8 {
    100
}
fn default_frames() -> u32 {
    1
}

/// Camera backed by an external capture command
pub struct CommandCamera {
    settings: CameraSettings,
    ready: bool,
    counter: u64,
}

impl CommandCamera {
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            settings,
            ready: false,
            counter: 0,
        }
    }

    fn build_args(&self, options: &CaptureOptions, output: &str) -> Vec<String> {
        let mut args = vec![
            "-q".to_string(),
            "-d".to_string(),
            self.settings.device.clone(),
            "-r".to_string(),
            format!("{}x{}", self.settings.width, self.settings.height),
            "--jpeg".to_string(),
            self.settings.quality.to_string(),
            "-F".to_string(),
            self.settings.frames.to_string(),
        ];
        if self.settings.delay > 0 {
            args.push("-D".to_string());
            args.push(self.settings.delay.to_string());
        }
        if options.timestamp {
            args.push("--timestamp".to_string());
            args.push("%Y-%m-%d %H:%M:%S".to_string());
        }
        if options.rotation > 0 {
            args.push("--rotate".to_string());
            args.push(options.rotation.to_string());
        }
        args.push(output.to_string());
        args
    }

    fn scratch_path(&mut self) -> PathBuf {
        self.counter += 1;
        std::env::temp_dir().join(format!(
            "lane_capture_{}_{}.jpg",
            std::process::id(),
            self.counter
        ))
    }
}

#[async_trait]
impl CameraDevice for CommandCamera {
    async fn init(&mut self) -> Result<(), HardwareError> {
        // Confirm the video node exists; the capture binary itself is only
        // exercised on the first acquisition.
        tokio::fs::metadata(&self.settings.device)
            .await
            .map_err(|e| {
                HardwareError::unavailable(
                    DeviceKind::Camera,
                    format!("video device {}: {}", self.settings.device, e),
                )
            })?;
        self.ready = true;
        tracing::debug!(device = %self.settings.device, "Camera ready");
        Ok(())
    }

    async fn capture(&mut self, options: &CaptureOptions) -> Result<Bytes, HardwareError> {
        if !self.ready {
            return Err(HardwareError::not_initialized(DeviceKind::Camera));
        }

        let output = self.scratch_path();
        let output_str = output.display().to_string();
        let args = self.build_args(options, &output_str);

        let result = Command::new(&self.settings.command)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                HardwareError::unavailable(
                    DeviceKind::Camera,
                    format!("spawn {}: {}", self.settings.command, e),
                )
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(HardwareError::unavailable(
                DeviceKind::Camera,
                format!("capture failed: {}", stderr.trim()),
            ));
        }

        let frame = tokio::fs::read(&output).await.map_err(|e| {
            HardwareError::unavailable(DeviceKind::Camera, format!("read capture: {}", e))
        })?;
        if let Err(e) = tokio::fs::remove_file(&output).await {
            tracing::warn!(path = %output_str, error = %e, "Could not remove capture scratch file");
        }

        Ok(Bytes::from(frame))
    }

    async fn shutdown(&mut self) -> Result<(), HardwareError> {
        self.ready = false;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}
