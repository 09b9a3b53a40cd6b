use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HardwareError;

/// Debounce behavior for a digital trigger input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceSettings {
    /// Sampling tick in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Minimum time since the last accepted change before a new one counts
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Input reads low when physically active
    #[serde(default)]
    pub active_low: bool,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_debounce_ms() -> u64 {
    1000
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
            active_low: false,
        }
    }
}

/// Raw digital input a trigger monitor samples
#[async_trait]
pub trait TriggerInput: Send + Sync {
    /// Read the current raw level
    async fn sample(&mut self) -> Result<bool, HardwareError>;
}
