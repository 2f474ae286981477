//! Error taxonomy for the receive path.
//!
//! Classification failures split into two groups: those the receive loop
//! recovers from by discarding the datagram, and those that end the session.
//! [`ReceiverError::is_recoverable`] makes that split explicit so the loop
//! never has to match on variants itself.

use thiserror::Error;

use crate::config::SeqPolicy;

/// Everything that can go wrong while receiving the stream.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// The 15-bit length field disagrees with the datagram's actual size.
    #[error("declared length {declared} does not match datagram length {actual}")]
    MalformedLength { declared: u16, actual: usize },

    /// The datagram is too short to hold the header it claims to carry.
    #[error("datagram of {len} bytes is shorter than the {needed}-byte header")]
    Truncated { len: usize, needed: usize },

    /// A sequence number with any of its low 3 bits set.
    #[error("sequence number {seq_no:#06x} has nonzero low bits")]
    ProtocolInvariantViolation { seq_no: u16 },

    /// A packet type outside the known set; the protocol model is incomplete.
    #[error("unknown packet type {packet_type} (len={len}, seq={seq_no:#06x})")]
    UnknownPacketType {
        packet_type: u8,
        len: usize,
        seq_no: u16,
    },

    /// Sending or receiving on the UDP socket failed.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The frame sink rejected a write or failed to close.
    #[error("frame sink error: {0}")]
    Sink(#[source] std::io::Error),
}

impl ReceiverError {
    /// Whether the receive loop should discard the datagram and keep going.
    ///
    /// Sequence-invariant violations are only recoverable under
    /// [`SeqPolicy::Discard`].
    pub fn is_recoverable(&self, policy: SeqPolicy) -> bool {
        match self {
            Self::MalformedLength { .. } | Self::Truncated { .. } => true,
            Self::ProtocolInvariantViolation { .. } => policy == SeqPolicy::Discard,
            Self::UnknownPacketType { .. } | Self::Transport(_) | Self::Sink(_) => false,
        }
    }
}
