//! Randomised robustness tests for the classifier and the session.
//!
//! No network: the session is driven through `handle_datagram` directly, with
//! its peer pointed at a socket that never reads.

use rand::Rng;

use mb_video::packet::{self, PacketType, VideoPart};
use mb_video::sink::MemorySink;
use mb_video::socket::Socket;
use mb_video::{ReceiverError, SeqPolicy, Session, SessionConfig};

/// Random byte soup never panics the classifier.
#[test]
fn classify_random_bytes_never_panics() {
    let mut rng = rand::rng();
    for _ in 0..10_000 {
        let len = rng.random_range(0..64);
        let buf: Vec<u8> = (0..len).map(|_| rng.random()).collect();
        if let Ok(d) = packet::classify(&buf) {
            assert_eq!(d.len(), buf.len());
            assert_eq!(d.seq_no & packet::SEQ_LOW_BITS, 0);
            if d.packet_type == PacketType::VideoPart {
                let _ = VideoPart::parse(&d);
            }
        }
    }
}

/// Random bytes with a correct length field mostly reach type dispatch.
#[test]
fn classify_self_consistent_random_datagrams() {
    let mut rng = rand::rng();
    for _ in 0..2_000 {
        let len = rng.random_range(packet::COMMON_HEADER_LEN..200);
        let mut buf: Vec<u8> = (0..len).map(|_| rng.random()).collect();
        let declared = (len as u16) | if rng.random() { 0x8000 } else { 0 };
        buf[0..2].copy_from_slice(&declared.to_le_bytes());
        buf[4] &= !0x07;

        let d = packet::classify(&buf).expect("length and seq are valid");
        assert_eq!(d.packet_type, PacketType::from_u8(buf[6]));
    }
}

/// Every random part_num/n_parts pair decodes to what was encoded.
#[test]
fn encoded_video_headers_decode() {
    let mut rng = rand::rng();
    for _ in 0..2_000 {
        let n_parts: u8 = rng.random_range(1..=127);
        let part_num: u8 = rng.random_range(0..64);
        let frame: u8 = rng.random();
        let seq: u16 = rng.random::<u16>() & !0x7;

        let buf = VideoPart::encode(seq, frame, n_parts, part_num, b"");
        let p = VideoPart::parse(&packet::classify(&buf).unwrap()).unwrap();
        assert_eq!(p.part_num, part_num);
        assert_eq!(p.n_parts, n_parts);
        assert_eq!(p.frame_num, frame);
        assert_eq!(p.is_last_part(), part_num + 1 == n_parts);
    }
}

/// A lenient session survives arbitrary garbage that avoids unknown types.
#[tokio::test]
async fn lenient_session_survives_garbage() {
    let sink_peer = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let socket = Socket::bind(
        "127.0.0.1:0".parse().unwrap(),
        sink_peer.local_addr().unwrap(),
    )
    .await
    .unwrap();
    let cfg = SessionConfig {
        seq_policy: SeqPolicy::Discard,
        ..SessionConfig::default()
    };
    let mut session = Session::from_socket(cfg, socket, MemorySink::new());

    let mut rng = rand::rng();
    for _ in 0..2_000 {
        let len = rng.random_range(0..64);
        let mut buf: Vec<u8> = (0..len).map(|_| rng.random()).collect();
        if buf.len() > 6 {
            buf[6] %= 3;
        }
        match session.handle_datagram(&buf).await {
            Ok(()) => {}
            Err(e) => panic!("unexpected fatal error: {e}"),
        }
    }
    assert_eq!(session.stats().datagrams, 2_000);

    // A genuinely unknown type is still fatal.
    let err = session
        .handle_datagram(&packet::header_bytes(8, 0, PacketType::Unknown(7)))
        .await
        .unwrap_err();
    assert!(matches!(err, ReceiverError::UnknownPacketType { .. }));
}
