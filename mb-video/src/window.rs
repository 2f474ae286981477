//! Receive-window bookkeeping echoed back in acknowledgements.
//!
//! The device expects two sequence numbers in every ack: the point up to
//! which everything has arrived, and the point up to which anything has
//! arrived.  The receiver does not yet distinguish the two; each video part
//! collapses both onto its own sequence number, which is what the device
//! has been observed to accept.  No wraparound handling is attempted.

/// The pair of sequence numbers carried in an acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceWindow {
    /// At or below this, every packet is confirmed received.
    pub start: u16,
    /// Up to this, some packets have been received.
    pub end: u16,
}

impl SequenceWindow {
    /// A window with both edges at `seq_no`.
    pub fn at(seq_no: u16) -> Self {
        Self {
            start: seq_no,
            end: seq_no,
        }
    }
}

impl std::fmt::Display for SequenceWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:#06x}, {:#06x}]", self.start, self.end)
    }
}

/// Session-owned window state.
#[derive(Debug, Clone)]
pub struct WindowTracker {
    window: SequenceWindow,
}

impl WindowTracker {
    /// Start with both edges at `seed`, normally the handshake's sequence
    /// number.
    pub fn new(seed: u16) -> Self {
        Self {
            window: SequenceWindow::at(seed),
        }
    }

    /// Record a received video part and return the updated window.
    pub fn observe(&mut self, seq_no: u16) -> SequenceWindow {
        self.window = SequenceWindow::at(seq_no);
        self.window
    }

    pub fn window(&self) -> SequenceWindow {
        self.window
    }
}
