//! Fixed handshake and acknowledgement packets.
//!
//! Both packets were lifted from captures of the official client.  Only the
//! bytes listed below are understood; everything else is replayed verbatim.
//!
//! | Packet | Offset | Field |
//! |---|---|---|
//! | handshake | 0x08-0x09 | initial sequence number (LE) |
//! | ack | 0x08-0x09 | `recv_window_start` (LE) |
//! | ack | 0x0a-0x0b | `recv_window_end` (LE) |

use crate::window::SequenceWindow;

pub const HANDSHAKE_LEN: usize = 48;
pub const ACK_LEN: usize = 30;

const OFF_HANDSHAKE_SEQ: usize = 0x08;
const OFF_ACK_START: usize = 0x08;
const OFF_ACK_END: usize = 0x0a;

/// Sending this starts the video feed.
pub const HANDSHAKE: [u8; HANDSHAKE_LEN] = [
    0x30, 0x80, 0x3a, 0xdd, 0x00, 0x00, 0x00, 0x57, 0xd0, 0xe9, 0x64, 0x00, 0x64, 0x00, 0xc0, 0x05,
    0x14, 0x00, 0x00, 0x0a, 0x00, 0x64, 0x00, 0x64, 0x00, 0xc0, 0x05, 0x14, 0x00, 0x00, 0x64, 0x00,
    0x14, 0x00, 0x64, 0x00, 0xc0, 0x05, 0x14, 0x00, 0x00, 0x64, 0x00, 0x01, 0x01, 0x04, 0x0a, 0x02,
];

/// Acknowledges the last part of a frame.  Without one roughly every half
/// second the device stops streaming.
pub const ACK: [u8; ACK_LEN] = [
    0x1e, 0x80, 0x3a, 0xdd, 0x00, 0x00, 0x04, 0x7d, 0x08, 0xea, 0x08, 0xea, 0x00, 0x00, 0xd0, 0xe9,
    0xd0, 0xe9, 0x00, 0x00, 0xd0, 0xe9, 0xd8, 0xe9, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Sequence number embedded in [`HANDSHAKE`]; seeds the window tracker.
pub fn handshake_seed_seq() -> u16 {
    u16::from_le_bytes([HANDSHAKE[OFF_HANDSHAKE_SEQ], HANDSHAKE[OFF_HANDSHAKE_SEQ + 1]])
}

/// A fresh copy of [`ACK`] carrying `window`.
pub fn build_ack(window: SequenceWindow) -> [u8; ACK_LEN] {
    let mut pkt = ACK;
    pkt[OFF_ACK_START..OFF_ACK_START + 2].copy_from_slice(&window.start.to_le_bytes());
    pkt[OFF_ACK_END..OFF_ACK_END + 2].copy_from_slice(&window.end.to_le_bytes());
    pkt
}

/// Read the window back out of an acknowledgement.  `None` if `pkt` is too
/// short to hold one.
pub fn read_ack_window(pkt: &[u8]) -> Option<SequenceWindow> {
    let start = pkt.get(OFF_ACK_START..OFF_ACK_START + 2)?;
    let end = pkt.get(OFF_ACK_END..OFF_ACK_END + 2)?;
    Some(SequenceWindow {
        start: u16::from_le_bytes([start[0], start[1]]),
        end: u16::from_le_bytes([end[0], end[1]]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::LENGTH_MASK;

    fn declared_len(pkt: &[u8]) -> usize {
        (u16::from_le_bytes([pkt[0], pkt[1]]) & LENGTH_MASK) as usize
    }

    #[test]
    fn templates_declare_their_own_length() {
        assert_eq!(declared_len(&HANDSHAKE), HANDSHAKE_LEN);
        assert_eq!(declared_len(&ACK), ACK_LEN);
    }

    #[test]
    fn seed_comes_from_handshake_bytes() {
        assert_eq!(handshake_seed_seq(), 0xe9d0);
        assert_eq!(handshake_seed_seq() & 0x7, 0);
    }

    #[test]
    fn ack_window_round_trip() {
        let w = SequenceWindow {
            start: 0x1234,
            end: 0x1234,
        };
        let pkt = build_ack(w);
        assert_eq!(&pkt[0x08..0x0c], &[0x34, 0x12, 0x34, 0x12]);
        assert_eq!(read_ack_window(&pkt), Some(w));
    }

    #[test]
    fn ack_patches_only_window_bytes() {
        let pkt = build_ack(SequenceWindow {
            start: 0x0100,
            end: 0x0208,
        });
        for (i, (&got, &orig)) in pkt.iter().zip(ACK.iter()).enumerate() {
            if !(0x08..0x0c).contains(&i) {
                assert_eq!(got, orig, "byte {i:#04x} changed");
            }
        }
        assert_eq!(&pkt[0x08..0x0c], &[0x00, 0x01, 0x08, 0x02]);
    }

    #[test]
    fn template_is_not_mutated_by_building() {
        let before = ACK;
        let _ = build_ack(SequenceWindow { start: 1, end: 2 });
        assert_eq!(ACK, before);
    }

    #[test]
    fn short_buffer_has_no_window() {
        assert_eq!(read_ack_window(&ACK[..0x0b]), None);
    }
}
