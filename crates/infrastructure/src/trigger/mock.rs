use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domain::trigger::TriggerInput;
use domain::{DeviceKind, HardwareError};

/// In-memory digital input for tests and bench mode
pub struct MockTriggerInput {
    level: Arc<AtomicBool>,
    fail: Arc<AtomicBool>,
}

/// Test-side handle driving a MockTriggerInput
#[derive(Clone)]
pub struct MockTriggerHandle {
    level: Arc<AtomicBool>,
    fail: Arc<AtomicBool>,
}

impl MockTriggerInput {
    pub fn new() -> (Self, MockTriggerHandle) {
        let level = Arc::new(AtomicBool::new(false));
        let fail = Arc::new(AtomicBool::new(false));

        let input = Self {
            level: level.clone(),
            fail: fail.clone(),
        };
        let handle = MockTriggerHandle { level, fail };
        (input, handle)
    }
}

impl MockTriggerHandle {
    pub fn set_level(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TriggerInput for MockTriggerInput {
    async fn sample(&mut self) -> Result<bool, HardwareError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(HardwareError::io(DeviceKind::Trigger, "mock sample failure"));
        }
        Ok(self.level.load(Ordering::SeqCst))
    }
}
