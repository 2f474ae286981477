//! Destinations for reassembled video bytes.
//!
//! The receive loop only knows [`FrameSink`]; what happens to the bytes
//! (recorded to disk, forwarded to a player, both) is decided by whoever
//! constructs the session.  Writes are synchronous: sinks are expected to be
//! fast enough not to threaten the acknowledgement deadline.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::net::{SocketAddr, UdpSocket};
use std::path::Path;

/// Accepts ordered chunks of the raw video stream.
pub trait FrameSink {
    /// Append `bytes`.  Called once per body, in stream order.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flush and release whatever the sink holds.  Called once when the
    /// session terminates.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

// ---------------------------------------------------------------------------
// FileSink
// ---------------------------------------------------------------------------

/// Records the raw stream to a file (playable as `.h264`).
#[derive(Debug)]
pub struct FileSink {
    out: BufWriter<File>,
}

impl FileSink {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }
}

impl FrameSink for FileSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)
    }

    fn close(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.out.get_ref().sync_all()
    }
}

// ---------------------------------------------------------------------------
// UdpForwardSink
// ---------------------------------------------------------------------------

/// Forwards each chunk as one datagram to a local player, e.g.
/// `ffplay udp://localhost:5004`.
#[derive(Debug)]
pub struct UdpForwardSink {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpForwardSink {
    /// Bind an ephemeral local socket that forwards to `dest`.
    pub fn new(dest: SocketAddr) -> io::Result<Self> {
        let bind: SocketAddr = if dest.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind)?;
        Ok(Self { socket, dest })
    }

    pub fn dest(&self) -> SocketAddr {
        self.dest
    }
}

impl FrameSink for UdpForwardSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self.socket.send_to(bytes, self.dest) {
            Ok(_) => Ok(()),
            // Nobody listening is normal when no player is attached.
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                log::trace!("[mb:sink] playback refused: {e}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// TeeSink
// ---------------------------------------------------------------------------

/// Writes every chunk to two sinks, first `a` then `b`.
#[derive(Debug)]
pub struct TeeSink<A, B> {
    pub a: A,
    pub b: B,
}

impl<A, B> TeeSink<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

impl<A: FrameSink, B: FrameSink> FrameSink for TeeSink<A, B> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.a.write(bytes)?;
        self.b.write(bytes)
    }

    /// Both sinks are closed even if the first fails; the first error wins.
    fn close(&mut self) -> io::Result<()> {
        let ra = self.a.close();
        let rb = self.b.close();
        ra.and(rb)
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Collects everything in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub bytes: Vec<u8>,
    /// Number of `write` calls.
    pub chunks: usize,
    pub closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for MemorySink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.bytes.extend_from_slice(bytes);
        self.chunks += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}
