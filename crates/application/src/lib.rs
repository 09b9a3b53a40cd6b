//! Application layer - Device controllers and lane workflows

pub mod camera;
pub mod events;
pub mod gate;
pub mod manager;
pub mod printer;
pub mod scanner;
pub mod ticket;
pub mod trigger;

pub use camera::CameraController;
pub use events::EventBus;
pub use gate::{GateController, GateStatus};
pub use manager::DeviceManager;
pub use printer::PrinterController;
pub use scanner::ScannerController;
pub use ticket::TicketData;
pub use trigger::TriggerMonitor;
