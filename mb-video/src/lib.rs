//! `mb-video`: receiver for a drone's MB video transport over UDP.
//!
//! # Architecture
//!
//! ```text
//!  device ──datagrams──▶ Socket ──▶ Session ──classify──▶ packet
//!     ▲                               │
//!     │                               ├── VideoPart ──▶ FrameReassembler ──▶ FrameSink
//!     │                               │                      │
//!     │                               │                 WindowTracker
//!     │                               │                      │ last part of frame
//!     └──────── ack ◀── AckEmitter ◀──┴──────────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]      : datagram classification and video header decoding
//! - [`template`]    : fixed handshake / acknowledgement packets
//! - [`window`]      : sequence window echoed back in acknowledgements
//! - [`reassembler`] : video part bodies → ordered sink writes
//! - [`ack`]         : acknowledgement emission
//! - [`session`]     : handshake, receive loop, dispatch
//! - [`state`]       : session state machine type
//! - [`sink`]        : frame sink trait and file / UDP / tee / memory sinks
//! - [`socket`]      : async UDP socket bound to the device
//! - [`config`]      : session configuration
//! - [`error`]       : error taxonomy

pub mod ack;
pub mod config;
pub mod error;
pub mod packet;
pub mod reassembler;
pub mod session;
pub mod sink;
pub mod socket;
pub mod state;
pub mod template;
pub mod window;

pub use config::{ReassemblyMode, SeqPolicy, SessionConfig};
pub use error::ReceiverError;
pub use session::{Session, SessionStats};
pub use sink::FrameSink;
