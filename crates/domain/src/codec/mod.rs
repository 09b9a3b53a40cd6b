//! Per-device wire codecs
//!
//! Pure encode/decode logic with no I/O. The scanner's line buffer is the
//! only stateful piece.

pub mod gate;
pub mod printer;
pub mod scanner;
