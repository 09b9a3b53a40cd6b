//! Infrastructure layer - Concrete transports and configuration

pub mod camera;
pub mod config;
pub mod link;
pub mod trigger;

pub use config::LaneConfig;
pub use link::{LinkFactory, LinkSection};
