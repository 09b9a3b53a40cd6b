mod mock;
mod serial;

pub use mock::{MockLink, MockLinkHandle};
pub use serial::{SerialLink, SerialSettings};

use domain::link::DeviceLink;
use domain::{DeviceKind, HardwareError};
use serde::{Deserialize, Serialize};

/// Transport behind a device link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum LinkSection {
    Serial(SerialSettings),
    Mock,
}

/// Factory for creating device links
pub struct LinkFactory;

impl LinkFactory {
    /// Create a device link from its configured transport section
    pub fn create_link(
        device: DeviceKind,
        section: &LinkSection,
    ) -> Result<Box<dyn DeviceLink>, HardwareError> {
        match section {
            LinkSection::Serial(settings) => {
                if settings.path.is_empty() {
                    return Err(HardwareError::invalid_config(
                        device,
                        "serial path must not be empty",
                    ));
                }
                Ok(Box::new(SerialLink::new(device, settings.clone())) as Box<dyn DeviceLink>)
            }
            LinkSection::Mock => Ok(Box::new(MockLink::detached(device)) as Box<dyn DeviceLink>),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_serial_link() {
        let section: LinkSection = serde_json::from_value(json!({
            "transport": "serial",
            "path": "/dev/ttyUSB0",
            "baud_rate": 115200
        }))
        .unwrap();

        let link = LinkFactory::create_link(DeviceKind::Gate, &section).unwrap();
        assert_eq!(link.transport(), "serial");
    }

    #[test]
    fn test_create_serial_link_with_minimal_section() {
        let section: LinkSection =
            serde_json::from_value(json!({"transport": "serial", "path": "COM3"})).unwrap();

        assert!(LinkFactory::create_link(DeviceKind::Printer, &section).is_ok());
    }

    #[test]
    fn test_create_mock_link() {
        let section: LinkSection = serde_json::from_value(json!({"transport": "mock"})).unwrap();

        let link = LinkFactory::create_link(DeviceKind::Scanner, &section).unwrap();
        assert_eq!(link.transport(), "mock");
    }

    #[test]
    fn test_empty_serial_path_is_rejected() {
        let section = LinkSection::Serial(SerialSettings::new(""));

        let result = LinkFactory::create_link(DeviceKind::Gate, &section);
        assert!(matches!(
            result,
            Err(HardwareError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_invalid_transport_tag_is_rejected() {
        let result: Result<LinkSection, _> =
            serde_json::from_value(json!({"transport": "bluetooth"}));
        assert!(result.is_err());
    }
}
