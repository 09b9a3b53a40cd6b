mod command;
mod mock;

pub use command::{CameraSettings, CommandCamera};
pub use mock::{MockCamera, MockCameraHandle};
