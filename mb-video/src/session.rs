//! One receive session: handshake, receive loop, dispatch.
//!
//! # Architecture
//!
//! ```text
//!            handshake / acks
//!  Session ─────────────────────────▶ device
//!    │  ◀───────── datagrams ────────
//!    │
//!    ├── packet::classify      (length, seq invariant, type)
//!    ├── FrameReassembler      (bodies → FrameSink)
//!    │     └── WindowTracker   (window for the next ack)
//!    └── AckEmitter            (window → ack packet → socket)
//! ```
//!
//! Everything runs on the task that calls [`Session::run`].  The only await
//! points are the receive and the sends, so acknowledgements go out in
//! packet-arrival order without any locking.
//!
//! # Limitations
//!
//! There is no receive timeout, retry, or reconnection.  If the device never
//! answers the handshake, or stops mid-stream, the session keeps waiting
//! until the shutdown future resolves.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use crate::ack::AckEmitter;
use crate::config::SessionConfig;
use crate::error::ReceiverError;
use crate::packet::{self, hex, PacketType, VideoPart};
use crate::reassembler::FrameReassembler;
use crate::sink::FrameSink;
use crate::socket::Socket;
use crate::state::SessionState;
use crate::template;
use crate::window::{SequenceWindow, WindowTracker};

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub datagrams: u64,
    /// Dropped for a recoverable classification error.
    pub discarded: u64,
    /// Datagrams from an address other than the peer.
    pub foreign: u64,
    pub handshake_responses: u64,
    pub data_packets: u64,
    pub video_parts: u64,
    pub frames_completed: u64,
    pub frames_abandoned: u64,
    pub acks_sent: u64,
    pub bytes_written: u64,
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} datagrams ({} discarded, {} foreign), {} handshake responses, {} data packets, \
             {} video parts, {} frames ({} abandoned), {} acks, {} bytes",
            self.datagrams,
            self.discarded,
            self.foreign,
            self.handshake_responses,
            self.data_packets,
            self.video_parts,
            self.frames_completed,
            self.frames_abandoned,
            self.acks_sent,
            self.bytes_written
        )
    }
}

/// A receive session against one device.
pub struct Session<S: FrameSink> {
    config: SessionConfig,
    /// `None` once terminated; dropping it releases the port.
    socket: Option<Socket>,
    local_addr: SocketAddr,
    peer: SocketAddr,
    state: SessionState,
    tracker: WindowTracker,
    reassembler: FrameReassembler,
    emitter: AckEmitter,
    sink: S,
    stats: SessionStats,
}

impl<S: FrameSink> Session<S> {
    /// Bind `config.bind` and prepare a session writing into `sink`.
    pub async fn bind(config: SessionConfig, sink: S) -> Result<Self, ReceiverError> {
        let socket = Socket::bind(config.bind, config.peer).await?;
        Ok(Self::from_socket(config, socket, sink))
    }

    /// Wrap an already-bound socket.  `socket.peer` wins over `config.peer`.
    pub fn from_socket(config: SessionConfig, socket: Socket, sink: S) -> Self {
        let reassembler = FrameReassembler::new(config.reassembly);
        Self {
            config,
            local_addr: socket.local_addr,
            peer: socket.peer,
            socket: Some(socket),
            state: SessionState::Idle,
            tracker: WindowTracker::new(template::handshake_seed_seq()),
            reassembler,
            emitter: AckEmitter::new(),
            sink,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn window(&self) -> SequenceWindow {
        self.tracker.window()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Snapshot of the session counters.
    pub fn stats(&self) -> SessionStats {
        let r = self.reassembler.stats();
        SessionStats {
            video_parts: r.parts,
            frames_completed: r.frames_completed,
            frames_abandoned: r.frames_abandoned,
            bytes_written: r.bytes_written,
            acks_sent: self.emitter.sent(),
            ..self.stats
        }
    }

    /// Send the handshake and seed the window from it.
    pub async fn start(&mut self) -> Result<(), ReceiverError> {
        if self.state != SessionState::Idle {
            log::debug!("[mb] start() in state {}; ignored", self.state);
            return Ok(());
        }
        self.socket()?.send(&template::HANDSHAKE).await?;
        self.tracker = WindowTracker::new(template::handshake_seed_seq());
        self.transition(SessionState::HandshakeSent);
        log::info!(
            "[mb] → handshake to {} (seed seq={:#06x})",
            self.peer,
            template::handshake_seed_seq()
        );
        Ok(())
    }

    /// Run until `shutdown` resolves or a fatal error occurs.
    ///
    /// Sends the handshake first if [`start`](Self::start) has not been
    /// called.  The sink is closed and the state is `Terminated` on return,
    /// whichever way the loop ended.  A loop error takes precedence over a
    /// failure to close the sink, which is then only logged.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<SessionStats, ReceiverError>
    where
        F: Future<Output = ()>,
    {
        let outcome = match self.start().await {
            Ok(()) => self.receive_loop(shutdown).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            log::error!("[mb] session terminated: {e}");
        }
        match (outcome, self.terminate()) {
            (Err(e), Err(close)) => {
                log::error!("[mb] closing sink failed: {close}");
                return Err(e);
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => return Err(e),
            (Ok(()), Ok(())) => {}
        }

        let stats = self.stats();
        log::info!("[mb] session finished: {stats}");
        Ok(stats)
    }

    async fn receive_loop<F>(&mut self, shutdown: F) -> Result<(), ReceiverError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut buf = vec![0u8; self.config.recv_buffer];

        loop {
            let (n, from) = {
                let socket = self.socket()?;
                tokio::select! {
                    _ = &mut shutdown => {
                        log::info!("[mb] shutdown requested");
                        return Ok(());
                    }
                    result = socket.recv_from(&mut buf) => result?,
                }
            };

            if from != self.peer {
                if self.stats.foreign == 0 {
                    log::warn!(
                        "[mb] ← {n} B from {from}, expected {}; ignoring datagrams not from the device",
                        self.peer
                    );
                } else {
                    log::debug!("[mb] ← {n} B from {from}, not the device; ignored");
                }
                self.stats.foreign += 1;
                continue;
            }

            self.handle_datagram(&buf[..n]).await?;
        }
    }

    /// Classify one datagram and act on it.
    ///
    /// Recoverable problems are logged, counted, and swallowed; `Err` means
    /// the session must end.
    pub async fn handle_datagram(&mut self, buf: &[u8]) -> Result<(), ReceiverError> {
        if self.state == SessionState::Terminated {
            log::warn!("[mb] datagram after termination; ignored");
            return Ok(());
        }
        if self.state == SessionState::HandshakeSent {
            self.transition(SessionState::Streaming);
        }
        self.stats.datagrams += 1;

        let dgram = match packet::classify(buf) {
            Ok(d) => d,
            Err(e) => return self.discard_or_fail(e, buf),
        };

        match dgram.packet_type {
            PacketType::HandshakeResponse => {
                self.stats.handshake_responses += 1;
                log::info!("[mb] ← handshake response seq={:#06x}", dgram.seq_no);
            }
            PacketType::DataAck => {
                self.stats.data_packets += 1;
                log::debug!(
                    "[mb] ← data packet seq={:#06x} len={}",
                    dgram.seq_no,
                    dgram.len()
                );
            }
            PacketType::VideoPart => {
                let part = match VideoPart::parse(&dgram) {
                    Ok(p) => p,
                    Err(e) => return self.discard_or_fail(e, buf),
                };
                log::debug!(
                    "[mb] ← video frame {} part {}/{} seq={:#06x} len={}",
                    part.frame_num,
                    part.part_num,
                    part.n_parts,
                    part.seq_no,
                    part.body.len()
                );
                log::trace!("[mb]   header: {}", hex(part.header));

                let ack = self.reassembler.handle_video_part(
                    &part,
                    &mut self.tracker,
                    &mut self.sink,
                )?;
                if let Some(window) = ack {
                    let socket = self.socket.as_ref().ok_or_else(socket_closed)?;
                    self.emitter.send_ack(socket, window).await?;
                }
            }
            PacketType::Unknown(packet_type) => {
                return Err(ReceiverError::UnknownPacketType {
                    packet_type,
                    len: dgram.len(),
                    seq_no: dgram.seq_no,
                });
            }
        }
        Ok(())
    }

    /// Close the socket and the sink, and move to `Terminated`.  Idempotent.
    pub fn terminate(&mut self) -> Result<(), ReceiverError> {
        if self.state == SessionState::Terminated {
            return Ok(());
        }
        self.reassembler.finish();
        self.socket = None;
        self.transition(SessionState::Terminated);
        self.sink.close().map_err(ReceiverError::Sink)
    }

    fn socket(&self) -> Result<&Socket, ReceiverError> {
        self.socket.as_ref().ok_or_else(socket_closed)
    }

    fn discard_or_fail(&mut self, e: ReceiverError, buf: &[u8]) -> Result<(), ReceiverError> {
        if e.is_recoverable(self.config.seq_policy) {
            self.stats.discarded += 1;
            log::warn!(
                "[mb] ← discarded {} B datagram ({e}); head: {}",
                buf.len(),
                hex(&buf[..buf.len().min(packet::COMMON_HEADER_LEN)])
            );
            Ok(())
        } else {
            Err(e)
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} → {}",
            self.state,
            next
        );
        log::debug!("[mb] state {} → {}", self.state, next);
        self.state = next;
    }
}

fn socket_closed() -> ReceiverError {
    ReceiverError::Transport(io::Error::new(
        io::ErrorKind::NotConnected,
        "session terminated",
    ))
}
