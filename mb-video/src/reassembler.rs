//! Turns video parts into an ordered byte stream for the sink.
//!
//! [`FrameReassembler`] has two modes (see [`ReassemblyMode`]):
//!
//! - **Passthrough**: every body goes to the sink the moment it arrives.
//!   Ordering is whatever the device sent; gaps are not detected.  This is
//!   the mode the device is known to work with.
//! - **Buffered**: parts of the current frame are held by `part_num` and
//!   written in order once all `n_parts` are present.  A part from another
//!   frame abandons whatever is pending.
//!
//! In both modes the window tracker sees every part, and reaching the last
//! part of a frame yields the window to acknowledge.  Sending the ack is the
//! caller's job; this module does no socket I/O.

use std::collections::BTreeMap;

use crate::config::ReassemblyMode;
use crate::error::ReceiverError;
use crate::packet::VideoPart;
use crate::sink::FrameSink;
use crate::window::{SequenceWindow, WindowTracker};

/// Counters kept across the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    pub parts: u64,
    /// Frames whose last part was seen (passthrough) or that were flushed
    /// complete (buffered).
    pub frames_completed: u64,
    /// Buffered mode only: frames dropped because another frame started.
    pub frames_abandoned: u64,
    /// Buffered mode only: duplicate, out-of-range, or wrongly sized parts
    /// ignored.
    pub parts_ignored: u64,
    pub bytes_written: u64,
}

#[derive(Debug)]
struct PendingFrame {
    frame_num: u8,
    n_parts: u8,
    parts: BTreeMap<u8, Vec<u8>>,
}

impl PendingFrame {
    fn is_complete(&self) -> bool {
        self.parts.len() == self.n_parts as usize
    }
}

/// Per-session frame assembly state.
#[derive(Debug)]
pub struct FrameReassembler {
    mode: ReassemblyMode,
    pending: Option<PendingFrame>,
    stats: ReassemblyStats,
}

impl FrameReassembler {
    pub fn new(mode: ReassemblyMode) -> Self {
        Self {
            mode,
            pending: None,
            stats: ReassemblyStats::default(),
        }
    }

    pub fn mode(&self) -> ReassemblyMode {
        self.mode
    }

    pub fn stats(&self) -> ReassemblyStats {
        self.stats
    }

    /// Process one video part.
    ///
    /// Returns `Ok(Some(window))` when `part` is the last of its frame and an
    /// acknowledgement carrying `window` must go out.  Sink failures are the
    /// only error.
    pub fn handle_video_part<S: FrameSink + ?Sized>(
        &mut self,
        part: &VideoPart<'_>,
        tracker: &mut WindowTracker,
        sink: &mut S,
    ) -> Result<Option<SequenceWindow>, ReceiverError> {
        self.stats.parts += 1;

        match self.mode {
            ReassemblyMode::Passthrough => {
                sink.write(part.body).map_err(ReceiverError::Sink)?;
                self.stats.bytes_written += part.body.len() as u64;
            }
            ReassemblyMode::Buffered => self.buffer_part(part, sink)?,
        }

        let window = tracker.observe(part.seq_no);

        if part.is_last_part() {
            if self.mode == ReassemblyMode::Passthrough {
                self.stats.frames_completed += 1;
            }
            Ok(Some(window))
        } else {
            Ok(None)
        }
    }

    /// Flush or drop whatever is pending at the end of a session.  An
    /// incomplete frame is counted as abandoned.
    pub fn finish(&mut self) {
        if let Some(pending) = self.pending.take() {
            log::warn!(
                "[mb] frame {} incomplete at shutdown ({}/{} parts)",
                pending.frame_num,
                pending.parts.len(),
                pending.n_parts
            );
            self.stats.frames_abandoned += 1;
        }
    }

    fn buffer_part<S: FrameSink + ?Sized>(
        &mut self,
        part: &VideoPart<'_>,
        sink: &mut S,
    ) -> Result<(), ReceiverError> {
        if let Some(pending) = &self.pending {
            if pending.frame_num != part.frame_num {
                log::warn!(
                    "[mb] frame {} abandoned with {}/{} parts; frame {} started",
                    pending.frame_num,
                    pending.parts.len(),
                    pending.n_parts,
                    part.frame_num
                );
                self.stats.frames_abandoned += 1;
                self.pending = None;
            }
        }

        let pending = self.pending.get_or_insert_with(|| PendingFrame {
            frame_num: part.frame_num,
            n_parts: part.n_parts,
            parts: BTreeMap::new(),
        });

        // The first part of a frame fixes its size.
        if part.n_parts != pending.n_parts {
            log::warn!(
                "[mb] frame {} part {} claims n_parts={}, frame has {}; ignored",
                part.frame_num,
                part.part_num,
                part.n_parts,
                pending.n_parts
            );
            self.stats.parts_ignored += 1;
            return Ok(());
        }

        if part.part_num >= pending.n_parts {
            log::warn!(
                "[mb] frame {} part {} out of range (n_parts={}); ignored",
                part.frame_num,
                part.part_num,
                pending.n_parts
            );
            // A rejected part must not fix the size of a frame it opened.
            if pending.parts.is_empty() {
                self.pending = None;
            }
            self.stats.parts_ignored += 1;
            return Ok(());
        }

        if pending.parts.contains_key(&part.part_num) {
            log::debug!(
                "[mb] duplicate frame {} part {}",
                part.frame_num,
                part.part_num
            );
            self.stats.parts_ignored += 1;
            return Ok(());
        }
        pending.parts.insert(part.part_num, part.body.to_vec());

        if pending.is_complete() {
            let done = self.pending.take();
            for body in done.into_iter().flat_map(|f| f.parts.into_values()) {
                sink.write(&body).map_err(ReceiverError::Sink)?;
                self.stats.bytes_written += body.len() as u64;
            }
            self.stats.frames_completed += 1;
        }
        Ok(())
    }
}
