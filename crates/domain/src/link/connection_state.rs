use serde::{Deserialize, Serialize};

/// Connection state for device links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Never opened, no active open attempt
    Uninitialized,
    /// Currently performing the open sequence
    Opening,
    /// Open and usable for I/O
    Ready,
    /// Explicitly closed; terminal
    Closed,
    /// A transport failure was observed (link may be reopened)
    Faulted,
}

impl ConnectionState {
    /// Check if state allows an open attempt
    pub fn can_open(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Faulted)
    }

    /// Check if the link is usable for I/O
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Check if the link was disposed
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Check if in a transitional state
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Opening)
    }

    /// Transition to opening state
    pub fn to_opening(&self) -> Result<Self, &'static str> {
        match self {
            Self::Uninitialized | Self::Faulted => Ok(Self::Opening),
            _ => Err("Can only open from Uninitialized or Faulted state"),
        }
    }

    /// Transition to ready state
    pub fn to_ready(&self) -> Result<Self, &'static str> {
        match self {
            Self::Opening => Ok(Self::Ready),
            _ => Err("Can only become ready from Opening state"),
        }
    }

    /// Transition to closed state
    pub fn to_closed(&self) -> Self {
        Self::Closed
    }

    /// Transition to faulted state; a closed link stays closed
    pub fn to_faulted(&self) -> Self {
        match self {
            Self::Closed => Self::Closed,
            _ => Self::Faulted,
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Uninitialized
    }
}
