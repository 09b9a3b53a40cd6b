use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use domain::camera::{CameraDevice, CaptureOptions};
use domain::{DeviceKind, HardwareError};
use tokio::sync::Mutex;

/// Frame returned when nothing was scripted
const PLACEHOLDER_FRAME: &[u8] = b"mock-frame";

/// In-memory camera for tests and bench mode
pub struct MockCamera {
    ready: bool,
    frames: Arc<Mutex<VecDeque<Bytes>>>,
    fail_captures: Arc<AtomicBool>,
}

/// Test-side handle scripting a MockCamera
#[derive(Clone)]
pub struct MockCameraHandle {
    frames: Arc<Mutex<VecDeque<Bytes>>>,
    fail_captures: Arc<AtomicBool>,
}

impl MockCamera {
    pub fn new() -> (Self, MockCameraHandle) {
        let frames = Arc::new(Mutex::new(VecDeque::new()));
        let fail_captures = Arc::new(AtomicBool::new(false));

        let camera = Self {
            ready: false,
            frames: frames.clone(),
            fail_captures: fail_captures.clone(),
        };
        let handle = MockCameraHandle {
            frames,
            fail_captures,
        };
        (camera, handle)
    }
}

impl MockCameraHandle {
    /// Queue one frame for the next capture
    pub async fn push_frame(&self, frame: &[u8]) {
        self.frames
            .lock()
            .await
            .push_back(Bytes::copy_from_slice(frame));
    }

    pub fn set_fail_captures(&self, fail: bool) {
        self.fail_captures.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CameraDevice for MockCamera {
    async fn init(&mut self) -> Result<(), HardwareError> {
        self.ready = true;
        Ok(())
    }

    async fn capture(&mut self, _options: &CaptureOptions) -> Result<Bytes, HardwareError> {
        if !self.ready {
            return Err(HardwareError::not_initialized(DeviceKind::Camera));
        }
        if self.fail_captures.load(Ordering::SeqCst) {
            return Err(HardwareError::unavailable(
                DeviceKind::Camera,
                "mock capture failure",
            ));
        }
        let mut frames = self.frames.lock().await;
        Ok(frames
            .pop_front()
            .unwrap_or_else(|| Bytes::from_static(PLACEHOLDER_FRAME)))
    }

    async fn shutdown(&mut self) -> Result<(), HardwareError> {
        self.ready = false;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}
