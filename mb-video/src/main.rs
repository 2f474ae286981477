//! Entry point for `mb-video`.
//!
//! Parses CLI arguments, builds the sink, and runs one receive session until
//! Ctrl+C.  All protocol work is delegated to the library; `main.rs` owns only
//! process setup (logging, signal handling, argument parsing).
//!
//! Live view while recording:
//! `ffplay -sync ext -an -fast -framedrop udp://localhost:5004`

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use mb_video::config::{self, ReassemblyMode, SeqPolicy, SessionConfig};
use mb_video::sink::{FileSink, FrameSink, TeeSink, UdpForwardSink};
use mb_video::Session;

/// Record the video feed from a drone speaking the MB protocol.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Device address.  Defaults to the WiFi address, or the USB one with --usb.
    #[arg(short, long)]
    peer: Option<SocketAddr>,

    /// Use the address the device has when connected over USB.
    #[arg(long, conflicts_with = "peer")]
    usb: bool,

    /// Local address to receive on.
    #[arg(short, long, default_value_t = SocketAddr::from(([0, 0, 0, 0], config::DEFAULT_LOCAL_PORT)))]
    bind: SocketAddr,

    /// File the raw H.264 stream is written to.
    #[arg(short, long, default_value = "outvid.h264")]
    output: PathBuf,

    /// Where to forward the stream for live playback.
    #[arg(long, default_value = "127.0.0.1:5004")]
    playback: SocketAddr,

    /// Do not forward the stream for playback.
    #[arg(long)]
    no_playback: bool,

    /// Largest datagram accepted.
    #[arg(long, default_value_t = config::DEFAULT_RECV_BUFFER)]
    recv_buffer: usize,

    /// Drop datagrams with a malformed sequence number instead of stopping.
    #[arg(long)]
    lenient_seq: bool,

    /// Hold each frame until all its parts arrived and write them in order.
    #[arg(long)]
    buffered: bool,
}

impl Cli {
    fn session_config(&self) -> Result<SessionConfig> {
        let peer = match (self.peer, self.usb) {
            (Some(peer), _) => peer,
            (None, true) => config::DEFAULT_USB_PEER.parse()?,
            (None, false) => config::DEFAULT_WIFI_PEER.parse()?,
        };
        Ok(SessionConfig {
            peer,
            bind: self.bind,
            recv_buffer: self.recv_buffer,
            seq_policy: if self.lenient_seq {
                SeqPolicy::Discard
            } else {
                SeqPolicy::Fatal
            },
            reassembly: if self.buffered {
                ReassemblyMode::Buffered
            } else {
                ReassemblyMode::Passthrough
            },
        })
    }

    fn sink(&self) -> Result<Box<dyn FrameSink + Send>> {
        let file = FileSink::create(&self.output)
            .with_context(|| format!("creating {}", self.output.display()))?;
        log::info!("Recording to {}", self.output.display());

        if self.no_playback {
            return Ok(Box::new(file));
        }
        let playback =
            UdpForwardSink::new(self.playback).context("binding playback forwarder")?;
        log::info!("Forwarding to {} for playback", playback.dest());
        Ok(Box::new(TeeSink::new(file, playback)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity; default to info so frames are not spammed.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg = cli.session_config()?;
    let sink = cli.sink()?;

    log::info!("Receiving on {}, device at {}", cfg.bind, cfg.peer);
    let mut session = Session::bind(cfg, sink)
        .await
        .context("binding receive socket")?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Cannot listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    session.run(shutdown).await?;
    Ok(())
}
