/// Default trigger command (ESC t) most serial scanners understand
pub const DEFAULT_TRIGGER_COMMAND: [u8; 2] = [0x1B, 0x74];

/// Terminator byte scanners append after each barcode
const TERMINATOR: char = '\r';

/// Accumulates inbound scanner bytes and yields complete barcode lines
///
/// A barcode split across chunk deliveries is retained until its terminator
/// arrives; a burst carrying several terminators yields every complete line
/// in order.
#[derive(Debug, Default)]
pub struct ScanBuffer {
    pending: String,
}

impl ScanBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one inbound chunk, returning each completed barcode in order
    ///
    /// Lines are trimmed; empty lines are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(chunk));

        let mut complete = Vec::new();
        while let Some(pos) = self.pending.find(TERMINATOR) {
            let barcode = self.pending[..pos].trim().to_string();
            self.pending.drain(..=pos);
            if !barcode.is_empty() {
                complete.push(barcode);
            }
        }
        complete
    }

    /// Text held back waiting for a terminator
    pub fn pending(&self) -> &str {
        &self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_line() {
        let mut buffer = ScanBuffer::new();
        let lines = buffer.push(b"ABC123\r");
        assert_eq!(lines, vec!["ABC123"]);
        assert!(buffer.pending().is_empty());
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut buffer = ScanBuffer::new();
        assert!(buffer.push(b"ABC1").is_empty());
        assert_eq!(buffer.pending(), "ABC1");

        let lines = buffer.push(b"23\r");
        assert_eq!(lines, vec!["ABC123"]);
    }

    #[test]
    fn test_burst_with_multiple_terminators() {
        let mut buffer = ScanBuffer::new();
        let lines = buffer.push(b"A-1\rB-2\rC-3");
        assert_eq!(lines, vec!["A-1", "B-2"]);
        assert_eq!(buffer.pending(), "C-3");

        let lines = buffer.push(b"\r");
        assert_eq!(lines, vec!["C-3"]);
    }

    #[test]
    fn test_chunking_does_not_change_output() {
        let mut whole = ScanBuffer::new();
        let mut split = ScanBuffer::new();

        let all = whole.push(b"P-0001\rP-0002\r");

        let mut collected = Vec::new();
        for chunk in [&b"P-00"[..], b"01\rP", b"-000", b"2\r"] {
            collected.extend(split.push(chunk));
        }

        assert_eq!(all, collected);
    }

    #[test]
    fn test_empty_lines_are_dropped() {
        let mut buffer = ScanBuffer::new();
        assert!(buffer.push(b"\r\r  \r").is_empty());
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let mut buffer = ScanBuffer::new();
        let lines = buffer.push(b"  TKT-9  \r");
        assert_eq!(lines, vec!["TKT-9"]);
    }
}
