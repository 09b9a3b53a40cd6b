use serde::{Deserialize, Serialize};

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;

/// Text alignment (ESC a n)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl Alignment {
    fn opcode(self) -> u8 {
        match self {
            Self::Left => 0x00,
            Self::Center => 0x01,
            Self::Right => 0x02,
        }
    }
}

/// Character size (ESC ! n)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSize {
    Normal,
    Large,
    Small,
}

impl TextSize {
    fn opcode(self) -> u8 {
        match self {
            Self::Normal => 0x00,
            Self::Large => 0x10,
            Self::Small => 0x01,
        }
    }
}

/// Formatting for a single print call
///
/// Formatting is never cumulative: every call is bounded by printer resets,
/// so an option only affects the text of the call that requested it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintOptions {
    #[serde(default)]
    pub align: Option<Alignment>,
    #[serde(default)]
    pub size: Option<TextSize>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub underline: bool,
}

impl PrintOptions {
    pub fn centered() -> Self {
        Self {
            align: Some(Alignment::Center),
            ..Self::default()
        }
    }
}

/// Encode one print call: reset, requested directives, text, reset
pub fn encode_print(text: &str, options: &PrintOptions) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(text.len() + 16);
    buffer.extend_from_slice(&[ESC, 0x40]); // ESC @: initialize
    if let Some(align) = options.align {
        buffer.extend_from_slice(&[ESC, 0x61, align.opcode()]); // ESC a n
    }
    if let Some(size) = options.size {
        buffer.extend_from_slice(&[ESC, 0x21, size.opcode()]); // ESC ! n
    }
    if options.bold {
        buffer.extend_from_slice(&[ESC, 0x45, 0x01]); // ESC E 1: bold on
    }
    if options.underline {
        buffer.extend_from_slice(&[ESC, 0x2D, 0x01]); // ESC - 1: underline on
    }
    buffer.extend_from_slice(text.as_bytes());
    buffer.extend_from_slice(&[ESC, 0x40]); // back to defaults
    buffer
}

/// Encode a barcode print with human-readable text below
pub fn encode_barcode(data: &str, height: u8) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(data.len() + 16);
    buffer.extend_from_slice(&[GS, 0x68, height]); // GS h n: barcode height
    buffer.extend_from_slice(&[GS, 0x77, 0x02]); // GS w n: module width
    buffer.extend_from_slice(&[GS, 0x48, 0x02]); // GS H n: HRI below barcode
    buffer.extend_from_slice(&[GS, 0x66, 0x00]); // GS f n: HRI font A
    buffer.extend_from_slice(&[GS, 0x6B, 0x04]); // GS k m: CODE39
    buffer.extend_from_slice(data.as_bytes());
    buffer.push(0x00); // NUL terminator
    buffer
}

/// Encode a full paper cut
pub fn encode_cut() -> Vec<u8> {
    vec![GS, 0x56, 0x00] // GS V 0: full cut
}

/// Encode a feed of n lines (ESC d n)
pub fn encode_feed(lines: u8) -> Vec<u8> {
    vec![ESC, 0x64, lines]
}
