//! Async UDP transport to the device.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that knows the
//! one peer it talks to.  All protocol logic lives elsewhere; this module owns
//! only byte I/O.  Sends are `&self` but the session drives every send from
//! its single task, so they are never concurrent.

use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::error::ReceiverError;

/// A UDP socket paired with the device address.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after the OS assigns a port).
    pub local_addr: SocketAddr,
    /// Where handshakes and acknowledgements go.
    pub peer: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind to `local_addr` and target `peer`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr, peer: SocketAddr) -> Result<Self, ReceiverError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self {
            local_addr,
            peer,
            inner,
        })
    }

    /// Send `bytes` as one datagram to the peer.
    pub async fn send(&self, bytes: &[u8]) -> Result<(), ReceiverError> {
        self.inner.send_to(bytes, self.peer).await?;
        Ok(())
    }

    /// Wait for the next datagram, from anyone.
    ///
    /// Returns `(bytes_read, sender_address)`; `buf` must be large enough for
    /// the biggest expected datagram or the tail is lost.
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), ReceiverError> {
        Ok(self.inner.recv_from(buf).await?)
    }
}
