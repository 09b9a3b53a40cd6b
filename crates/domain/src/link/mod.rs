mod connection_state;
mod device_link;

pub use connection_state::ConnectionState;
pub use device_link::DeviceLink;
