use config::{Config, ConfigError, Environment, File};
use domain::codec::gate::GateCommandSet;
use domain::codec::scanner::DEFAULT_TRIGGER_COMMAND;
use domain::trigger::DebounceSettings;
use serde::{Deserialize, Serialize};

use crate::camera::CameraSettings;
use crate::link::LinkSection;
use crate::trigger::GpioSettings;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GateConfig {
    pub link: LinkSection,
    #[serde(default)]
    pub commands: GateCommandSet,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PrinterConfig {
    pub link: LinkSection,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScannerConfig {
    pub link: LinkSection,
    #[serde(default = "default_trigger_command")]
    pub trigger_command: Vec<u8>,
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

fn default_trigger_command() -> Vec<u8> {
    DEFAULT_TRIGGER_COMMAND.to_vec()
}
fn default_scan_interval_ms() -> u64 {
    1000
}
fn default_max_consecutive_failures() -> u32 {
    10
}

/// Where the trigger monitor samples its raw level from
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum TriggerSource {
    Gpio(GpioSettings),
    Mock,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TriggerConfig {
    pub input: TriggerSource,
    #[serde(default)]
    pub debounce: DebounceSettings,
}

/// Which capture backend drives the camera
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum CameraBackend {
    Command(CameraSettings),
    Mock,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    pub capture: CameraBackend,
    #[serde(default = "default_stream_interval_ms")]
    pub stream_interval_ms: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

fn default_stream_interval_ms() -> u64 {
    100
}

/// Full per-lane device configuration
///
/// A missing device section means that peripheral is not installed on this
/// lane; the manager simply skips it.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LaneConfig {
    pub lane_id: String,
    #[serde(default)]
    pub gate: Option<GateConfig>,
    #[serde(default)]
    pub printer: Option<PrinterConfig>,
    #[serde(default)]
    pub scanner: Option<ScannerConfig>,
    #[serde(default)]
    pub trigger: Option<TriggerConfig>,
    #[serde(default)]
    pub camera: Option<CameraConfig>,
}

impl LaneConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default settings
            .set_default("lane_id", "lane-1")?
            // Base config file - e.g. config/default.toml
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            // Per-mode overrides - e.g. config/development.toml
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Installation-local overrides, kept out of version control
            .add_source(File::with_name(&format!("{}/local", config_dir)).required(false))
            // Environment variables (e.g. LANE__GATE__LINK__PATH=/dev/ttyUSB1)
            .add_source(Environment::with_prefix("LANE").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Swap every configured backend for its mock, keeping the rest of the
    /// section intact. Used on benches without the real peripherals attached.
    pub fn force_mock(&mut self) {
        if let Some(gate) = &mut self.gate {
            gate.link = LinkSection::Mock;
        }
        if let Some(printer) = &mut self.printer {
            printer.link = LinkSection::Mock;
        }
        if let Some(scanner) = &mut self.scanner {
            scanner.link = LinkSection::Mock;
        }
        if let Some(trigger) = &mut self.trigger {
            trigger.input = TriggerSource::Mock;
        }
        if let Some(camera) = &mut self.camera {
            camera.capture = CameraBackend::Mock;
        }
    }
}
