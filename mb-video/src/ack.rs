//! Acknowledgement emitter.
//!
//! The device stops streaming if it goes roughly half a second without an
//! acknowledgement, so one is sent for every frame-terminal video part.
//! Each ack is a fresh copy of [`template::ACK`] patched with the window.

use crate::error::ReceiverError;
use crate::packet::hex;
use crate::socket::Socket;
use crate::template;
use crate::window::SequenceWindow;

/// Sends acknowledgements and counts them.
#[derive(Debug, Default)]
pub struct AckEmitter {
    sent: u64,
    last: Option<SequenceWindow>,
}

impl AckEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an ack for `window` and send it to the socket's peer.
    pub async fn send_ack(
        &mut self,
        socket: &Socket,
        window: SequenceWindow,
    ) -> Result<(), ReceiverError> {
        let pkt = template::build_ack(window);
        socket.send(&pkt).await?;
        self.sent += 1;
        self.last = Some(window);
        log::debug!("[mb:ack] → ACK window={window}");
        log::trace!("[mb:ack]   bytes: {}", hex(&pkt));
        Ok(())
    }

    /// Number of acknowledgements sent so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Window carried by the most recent acknowledgement.
    pub fn last_window(&self) -> Option<SequenceWindow> {
        self.last
    }
}
