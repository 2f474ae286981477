//! Session configuration.
//!
//! The values here are what the receive loop needs; where the bytes end up
//! (file path, playback address) is decided by whoever builds the sink.

use std::net::SocketAddr;

/// Remote device address when connected over WiFi.
pub const DEFAULT_WIFI_PEER: &str = "192.168.2.1:9003";

/// Remote device address when connected directly over USB.
pub const DEFAULT_USB_PEER: &str = "192.168.42.2:9003";

/// Local port the device streams to.
pub const DEFAULT_LOCAL_PORT: u16 = 12346;

/// Receive buffer size; comfortably above the largest observed datagram.
pub const DEFAULT_RECV_BUFFER: usize = 2048;

/// What to do with a datagram whose sequence number has nonzero low bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeqPolicy {
    /// Terminate the session.
    #[default]
    Fatal,
    /// Log a warning and drop the datagram.
    Discard,
}

/// How video part bodies reach the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReassemblyMode {
    /// Write each body as soon as it arrives.
    #[default]
    Passthrough,
    /// Hold a frame's parts until all of them are present, then write in
    /// part order.
    Buffered,
}

/// Parameters for one receive session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote device address; handshakes and acks go here.
    pub peer: SocketAddr,
    /// Local address to bind.
    pub bind: SocketAddr,
    /// Largest datagram accepted in one receive.
    pub recv_buffer: usize,
    pub seq_policy: SeqPolicy,
    pub reassembly: ReassemblyMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            peer: SocketAddr::from(([192, 168, 2, 1], 9003)),
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_LOCAL_PORT)),
            recv_buffer: DEFAULT_RECV_BUFFER,
            seq_policy: SeqPolicy::Fatal,
            reassembly: ReassemblyMode::Passthrough,
        }
    }
}

impl SessionConfig {
    /// Configuration aimed at `peer`, otherwise default.
    pub fn with_peer(peer: SocketAddr) -> Self {
        Self {
            peer,
            ..Self::default()
        }
    }
}
