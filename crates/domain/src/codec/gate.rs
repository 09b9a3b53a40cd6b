use serde::{Deserialize, Serialize};

/// Acknowledgement opcodes the gate reports back
pub const ACK_OPEN_CONFIRMED: u8 = 0x10;
pub const ACK_CLOSE_CONFIRMED: u8 = 0x11;
pub const ACK_FAULT: u8 = 0x20;

/// Command bytes written to the gate actuator
///
/// Installations with non-standard boards override these per device section;
/// the defaults match the common single-byte opcode boards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateCommandSet {
    #[serde(default = "default_open_command")]
    pub open: Vec<u8>,
    #[serde(default = "default_close_command")]
    pub close: Vec<u8>,
    #[serde(default = "default_status_command")]
    pub status: Vec<u8>,
}

fn default_open_command() -> Vec<u8> {
    vec![0x01]
}

fn default_close_command() -> Vec<u8> {
    vec![0x02]
}

fn default_status_command() -> Vec<u8> {
    vec![0x03]
}

impl Default for GateCommandSet {
    fn default() -> Self {
        Self {
            open: default_open_command(),
            close: default_close_command(),
            status: default_status_command(),
        }
    }
}

/// Decoded meaning of one inbound gate byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateResponse {
    OpenConfirmed,
    CloseConfirmed,
    Fault,
    Other(u8),
}

/// Decode a single acknowledgement byte
pub fn decode(byte: u8) -> GateResponse {
    match byte {
        ACK_OPEN_CONFIRMED => GateResponse::OpenConfirmed,
        ACK_CLOSE_CONFIRMED => GateResponse::CloseConfirmed,
        ACK_FAULT => GateResponse::Fault,
        other => GateResponse::Other(other),
    }
}
