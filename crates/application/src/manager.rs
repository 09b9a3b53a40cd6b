use tracing::info;

use domain::camera::CameraDevice;
use domain::link::DeviceLink;
use domain::trigger::TriggerInput;
use domain::{DeviceKind, HardwareError};
use infrastructure::LinkFactory;
use infrastructure::camera::{CommandCamera, MockCamera};
use infrastructure::config::{CameraBackend, LaneConfig, TriggerSource};
use infrastructure::trigger::{GpioInput, MockTriggerInput};

use crate::camera::CameraController;
use crate::gate::GateController;
use crate::printer::PrinterController;
use crate::scanner::ScannerController;
use crate::ticket::{self, TicketData};
use crate::trigger::TriggerMonitor;

/// Owns one controller per configured peripheral of a lane.
///
/// A missing config section means the peripheral is not installed; its
/// accessor returns `None`.
pub struct DeviceManager {
    gate: Option<GateController>,
    printer: Option<PrinterController>,
    scanner: Option<ScannerController>,
    trigger: Option<TriggerMonitor>,
    camera: Option<CameraController>,
}

impl DeviceManager {
    /// Build and start controllers for every configured device. Links and
    /// devices connect in the background; connection failures surface as
    /// `Error` events, not as an error here.
    pub fn from_config(config: &LaneConfig) -> Result<Self, HardwareError> {
        let gate = match &config.gate {
            Some(section) => {
                let link = LinkFactory::create_link(DeviceKind::Gate, &section.link)?;
                Some(GateController::new(link, section.commands.clone()))
            }
            None => None,
        };

        let printer = match &config.printer {
            Some(section) => {
                let link = LinkFactory::create_link(DeviceKind::Printer, &section.link)?;
                Some(PrinterController::new(link))
            }
            None => None,
        };

        let scanner = match &config.scanner {
            Some(section) => {
                let link = LinkFactory::create_link(DeviceKind::Scanner, &section.link)?;
                Some(ScannerController::new(
                    link,
                    section.trigger_command.clone(),
                    section.max_consecutive_failures,
                ))
            }
            None => None,
        };

        let trigger = match &config.trigger {
            Some(section) => {
                let input: Box<dyn TriggerInput> = match &section.input {
                    TriggerSource::Gpio(settings) => Box::new(GpioInput::new(settings)),
                    TriggerSource::Mock => {
                        let (input, _handle) = MockTriggerInput::new();
                        Box::new(input)
                    }
                };
                Some(TriggerMonitor::new(input, section.debounce))
            }
            None => None,
        };

        let camera = match &config.camera {
            Some(section) => {
                let device: Box<dyn CameraDevice> = match &section.capture {
                    CameraBackend::Command(settings) => {
                        Box::new(CommandCamera::new(settings.clone()))
                    }
                    CameraBackend::Mock => {
                        let (camera, _handle) = MockCamera::new();
                        Box::new(camera)
                    }
                };
                Some(CameraController::new(
                    device,
                    section.max_consecutive_failures,
                ))
            }
            None => None,
        };

        let manager = Self {
            gate,
            printer,
            scanner,
            trigger,
            camera,
        };
        info!(
            lane_id = %config.lane_id,
            devices = manager.device_count(),
            "Device manager started"
        );
        Ok(manager)
    }

    pub fn gate(&self) -> Option<&GateController> {
        self.gate.as_ref()
    }

    pub fn printer(&self) -> Option<&PrinterController> {
        self.printer.as_ref()
    }

    pub fn scanner(&self) -> Option<&ScannerController> {
        self.scanner.as_ref()
    }

    pub fn trigger(&self) -> Option<&TriggerMonitor> {
        self.trigger.as_ref()
    }

    pub fn camera(&self) -> Option<&CameraController> {
        self.camera.as_ref()
    }

    pub fn device_count(&self) -> usize {
        [
            self.gate.is_some(),
            self.printer.is_some(),
            self.scanner.is_some(),
            self.trigger.is_some(),
            self.camera.is_some(),
        ]
        .iter()
        .filter(|installed| **installed)
        .count()
    }

    /// Print an entry ticket on the lane printer.
    pub async fn print_entry_ticket(&self, ticket: &TicketData) -> Result<(), HardwareError> {
        let printer = self
            .printer
            .as_ref()
            .ok_or_else(|| HardwareError::unavailable(DeviceKind::Printer, "no printer configured"))?;
        ticket::print_entry_ticket(printer, ticket).await
    }

    /// Dispose every controller. Idempotent.
    pub async fn dispose_all(&self) {
        if let Some(gate) = &self.gate {
            gate.dispose().await;
        }
        if let Some(printer) = &self.printer {
            printer.dispose().await;
        }
        if let Some(scanner) = &self.scanner {
            scanner.dispose().await;
        }
        if let Some(trigger) = &self.trigger {
            trigger.dispose().await;
        }
        if let Some(camera) = &self.camera {
            camera.dispose().await;
        }
        info!("All devices disposed");
    }
}
