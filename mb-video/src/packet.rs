//! Wire-format classification for inbound datagrams.
//!
//! Every datagram from the device starts with a small common header.  This
//! module is responsible for:
//! - Validating the declared length against the real datagram size.
//! - Checking that the sequence number has its low 3 bits clear.
//! - Tagging the datagram with its [`PacketType`].
//! - Decoding the extra header fields carried by video parts.
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **little-endian**.
//!
//! ```text
//! offset  field
//! 0x00    declared length (u16, low 15 bits meaningful)
//! 0x04    sequence number (u16, low 3 bits always zero)
//! 0x06    packet type     (u8: 0 handshake response, 1 data, 2 video)
//!
//! video parts only:
//! 0x10    frame number    (u8, wraps)
//! 0x11    bits 0-6: n_parts, bit 7: part_num bit 0
//! 0x12    bits 0-4: part_num bits 1-5
//! 0x14    body ...
//! ```

use std::fmt::Write as _;

use crate::error::ReceiverError;

/// Bytes needed to read the common header fields.
pub const COMMON_HEADER_LEN: usize = 7;

/// Fixed size of a video part header; the body starts right after it.
pub const VIDEO_HEADER_LEN: usize = 0x14;

/// Mask applied to the length field; the top bit carries something else.
pub const LENGTH_MASK: u16 = 0x7fff;

/// Low bits of every sequence number that must be zero.
pub const SEQ_LOW_BITS: u16 = 0x7;

const OFF_LENGTH: usize = 0x00;
const OFF_SEQ: usize = 0x04;
const OFF_TYPE: usize = 0x06;
const OFF_FRAME_NUM: usize = 0x10;
const OFF_PARTS: usize = 0x11;
const OFF_PART_HI: usize = 0x12;

/// Packet type carried at offset 0x06.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    HandshakeResponse,
    DataAck,
    VideoPart,
    /// Anything else; the receive loop treats this as fatal.
    Unknown(u8),
}

impl PacketType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::HandshakeResponse,
            1 => Self::DataAck,
            2 => Self::VideoPart,
            n => Self::Unknown(n),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::HandshakeResponse => 0,
            Self::DataAck => 1,
            Self::VideoPart => 2,
            Self::Unknown(n) => n,
        }
    }
}

impl std::fmt::Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HandshakeResponse => write!(f, "handshake-response"),
            Self::DataAck => write!(f, "data"),
            Self::VideoPart => write!(f, "video"),
            Self::Unknown(n) => write!(f, "unknown({n})"),
        }
    }
}

/// A datagram whose common header has been validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram<'a> {
    pub seq_no: u16,
    pub packet_type: PacketType,
    /// The whole datagram, header included.
    pub bytes: &'a [u8],
}

impl Datagram<'_> {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Header fields and body of one video part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoPart<'a> {
    pub seq_no: u16,
    pub frame_num: u8,
    /// Total parts in this frame (1-127 on a well-formed stream).
    pub n_parts: u8,
    /// Zero-based index of this part within its frame.
    pub part_num: u8,
    /// The fixed 20-byte header, kept for diagnostics.
    pub header: &'a [u8],
    pub body: &'a [u8],
}

impl<'a> VideoPart<'a> {
    /// Decode the video fields of a datagram already tagged as video.
    pub fn parse(dgram: &Datagram<'a>) -> Result<Self, ReceiverError> {
        let buf = dgram.bytes;
        if buf.len() < VIDEO_HEADER_LEN {
            return Err(ReceiverError::Truncated {
                len: buf.len(),
                needed: VIDEO_HEADER_LEN,
            });
        }

        Ok(Self {
            seq_no: dgram.seq_no,
            frame_num: buf[OFF_FRAME_NUM],
            n_parts: buf[OFF_PARTS] & 0x7f,
            part_num: decode_part_num(buf[OFF_PARTS], buf[OFF_PART_HI]),
            header: &buf[..VIDEO_HEADER_LEN],
            body: &buf[VIDEO_HEADER_LEN..],
        })
    }

    /// True for the part that completes its frame.
    ///
    /// A zero `n_parts` never matches.
    pub fn is_last_part(&self) -> bool {
        self.n_parts.checked_sub(1) == Some(self.part_num)
    }

    /// Encode a video part datagram.  Used by device simulators and tests;
    /// the bytes the receiver never reads are left zero.
    pub fn encode(seq_no: u16, frame_num: u8, n_parts: u8, part_num: u8, body: &[u8]) -> Vec<u8> {
        let mut buf = header_bytes(VIDEO_HEADER_LEN + body.len(), seq_no, PacketType::VideoPart);
        buf[OFF_FRAME_NUM] = frame_num;
        buf[OFF_PARTS] = (n_parts & 0x7f) | ((part_num & 0x01) << 7);
        buf[OFF_PART_HI] = (part_num >> 1) & 0x1f;
        buf[VIDEO_HEADER_LEN..].copy_from_slice(body);
        buf
    }
}

/// Reassemble the 6-bit part index split across bytes 0x11 and 0x12.
///
/// Bit 0 is the top bit of `b11`; bits 1-5 are the low five bits of `b12`.
pub fn decode_part_num(b11: u8, b12: u8) -> u8 {
    (b11 >> 7) | ((b12 & 0x1f) << 1)
}

/// Validate the common header and tag the datagram.
///
/// Returns [`Err`] if:
/// - the masked length field disagrees with `buf.len()` (`MalformedLength`),
/// - the datagram is too short for the common header (`Truncated`), or
/// - the sequence number has any low bit set (`ProtocolInvariantViolation`).
///
/// Unknown packet types are *not* an error here; they come back as
/// [`PacketType::Unknown`] and the caller decides.
pub fn classify(buf: &[u8]) -> Result<Datagram<'_>, ReceiverError> {
    if buf.len() < OFF_LENGTH + 2 {
        return Err(ReceiverError::Truncated {
            len: buf.len(),
            needed: COMMON_HEADER_LEN,
        });
    }

    let declared = u16::from_le_bytes([buf[OFF_LENGTH], buf[OFF_LENGTH + 1]]) & LENGTH_MASK;
    if declared as usize != buf.len() {
        return Err(ReceiverError::MalformedLength {
            declared,
            actual: buf.len(),
        });
    }

    if buf.len() < COMMON_HEADER_LEN {
        return Err(ReceiverError::Truncated {
            len: buf.len(),
            needed: COMMON_HEADER_LEN,
        });
    }

    let seq_no = u16::from_le_bytes([buf[OFF_SEQ], buf[OFF_SEQ + 1]]);
    if seq_no & SEQ_LOW_BITS != 0 {
        return Err(ReceiverError::ProtocolInvariantViolation { seq_no });
    }

    Ok(Datagram {
        seq_no,
        packet_type: PacketType::from_u8(buf[OFF_TYPE]),
        bytes: buf,
    })
}

/// Encode a bare common header of total length `len` (header plus zeroed
/// payload).  The top bit of the length field is set, as on the wire.
pub fn header_bytes(len: usize, seq_no: u16, packet_type: PacketType) -> Vec<u8> {
    let mut buf = vec![0u8; len.max(COMMON_HEADER_LEN)];
    let declared = (buf.len() as u16 & LENGTH_MASK) | 0x8000;
    buf[OFF_LENGTH..OFF_LENGTH + 2].copy_from_slice(&declared.to_le_bytes());
    buf[OFF_SEQ..OFF_SEQ + 2].copy_from_slice(&seq_no.to_le_bytes());
    buf[OFF_TYPE] = packet_type.to_u8();
    buf
}

/// `0x01 0x02 ...` rendering for trace logs.
pub fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 5);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{b:#04x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_handshake_response() {
        let buf = header_bytes(16, 0x0010, PacketType::HandshakeResponse);
        let d = classify(&buf).unwrap();
        assert_eq!(d.seq_no, 0x0010);
        assert_eq!(d.packet_type, PacketType::HandshakeResponse);
        assert_eq!(d.len(), 16);
    }

    #[test]
    fn length_top_bit_is_ignored() {
        let mut buf = header_bytes(12, 0, PacketType::DataAck);
        buf[1] &= 0x7f;
        assert!(classify(&buf).is_ok());
        buf[1] |= 0x80;
        assert!(classify(&buf).is_ok());
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let mut buf = header_bytes(24, 0, PacketType::VideoPart);
        buf.push(0);
        match classify(&buf) {
            Err(ReceiverError::MalformedLength { declared, actual }) => {
                assert_eq!(declared, 24);
                assert_eq!(actual, 25);
            }
            other => panic!("expected MalformedLength, got {other:?}"),
        }
    }

    #[test]
    fn one_byte_datagram_is_truncated() {
        assert!(matches!(
            classify(&[0x01]),
            Err(ReceiverError::Truncated { len: 1, .. })
        ));
    }

    #[test]
    fn short_but_self_consistent_datagram_is_truncated() {
        // Declares 4 bytes and is 4 bytes long, but the type byte is missing.
        let buf = [0x04, 0x80, 0x00, 0x00];
        assert!(matches!(
            classify(&buf),
            Err(ReceiverError::Truncated { len: 4, needed: 7 })
        ));
    }

    #[test]
    fn seq_low_bits_are_rejected() {
        let buf = header_bytes(8, 0x0001, PacketType::VideoPart);
        assert!(matches!(
            classify(&buf),
            Err(ReceiverError::ProtocolInvariantViolation { seq_no: 0x0001 })
        ));
        let buf = header_bytes(8, 0x1234, PacketType::VideoPart);
        assert!(matches!(
            classify(&buf),
            Err(ReceiverError::ProtocolInvariantViolation { seq_no: 0x1234 })
        ));
    }

    #[test]
    fn unknown_type_is_tagged_not_rejected() {
        let buf = header_bytes(8, 0x0008, PacketType::Unknown(9));
        let d = classify(&buf).unwrap();
        assert_eq!(d.packet_type, PacketType::Unknown(9));
    }

    #[test]
    fn seq_is_little_endian() {
        let buf = header_bytes(8, 0xe9d0, PacketType::DataAck);
        assert_eq!(&buf[OFF_SEQ..OFF_SEQ + 2], &[0xd0, 0xe9]);
        assert_eq!(classify(&buf).unwrap().seq_no, 0xe9d0);
    }

    #[test]
    fn part_num_boundaries() {
        assert_eq!(decode_part_num(0x00, 0x00), 0);
        assert_eq!(decode_part_num(0x80, 0x1f), 63);
        assert_eq!(decode_part_num(0x80, 0x00), 1);
        assert_eq!(decode_part_num(0x00, 0x01), 2);
        assert_eq!(decode_part_num(0x7f, 0x10), 32);
    }

    #[test]
    fn part_num_ignores_upper_bits_of_second_byte() {
        // Bits 5-7 of byte 0x12 belong to some other field.
        assert_eq!(decode_part_num(0x80, 0xe0), 1);
        assert_eq!(decode_part_num(0x00, 0x60 | 0x03), 6);
    }

    #[test]
    fn part_num_ignores_low_bits_of_first_byte() {
        // n_parts lives in bits 0-6 and must not leak into part_num.
        assert_eq!(decode_part_num(0x7f, 0x00), 0);
    }

    #[test]
    fn video_part_fields() {
        let buf = VideoPart::encode(0x0040, 5, 3, 2, b"body");
        let d = classify(&buf).unwrap();
        assert_eq!(d.packet_type, PacketType::VideoPart);
        let p = VideoPart::parse(&d).unwrap();
        assert_eq!(p.seq_no, 0x0040);
        assert_eq!(p.frame_num, 5);
        assert_eq!(p.n_parts, 3);
        assert_eq!(p.part_num, 2);
        assert_eq!(p.header.len(), VIDEO_HEADER_LEN);
        assert_eq!(p.body, b"body");
        assert!(p.is_last_part());
    }

    #[test]
    fn video_part_max_part_num() {
        let buf = VideoPart::encode(0, 255, 64, 63, b"");
        let p = VideoPart::parse(&classify(&buf).unwrap()).unwrap();
        assert_eq!(p.part_num, 63);
        assert_eq!(p.n_parts, 64);
        assert!(p.is_last_part());
        assert!(p.body.is_empty());
    }

    #[test]
    fn intermediate_part_is_not_last() {
        let buf = VideoPart::encode(0, 1, 3, 1, b"x");
        let p = VideoPart::parse(&classify(&buf).unwrap()).unwrap();
        assert!(!p.is_last_part());
    }

    #[test]
    fn zero_parts_is_never_last() {
        let buf = VideoPart::encode(0, 1, 0, 0, b"x");
        let p = VideoPart::parse(&classify(&buf).unwrap()).unwrap();
        assert!(!p.is_last_part());
    }

    #[test]
    fn short_video_part_is_truncated() {
        let buf = header_bytes(12, 0, PacketType::VideoPart);
        let d = classify(&buf).unwrap();
        assert!(matches!(
            VideoPart::parse(&d),
            Err(ReceiverError::Truncated {
                len: 12,
                needed: VIDEO_HEADER_LEN
            })
        ));
    }

    #[test]
    fn packet_type_round_trips_through_u8() {
        for n in 0..=u8::MAX {
            assert_eq!(PacketType::from_u8(n).to_u8(), n);
        }
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(hex(&[0x1e, 0x80, 0x00]), "0x1e 0x80 0x00");
        assert_eq!(hex(&[]), "");
    }
}
