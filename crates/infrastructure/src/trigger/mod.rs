mod gpio;
mod mock;

pub use gpio::{GpioInput, GpioSettings};
pub use mock::{MockTriggerHandle, MockTriggerInput};
