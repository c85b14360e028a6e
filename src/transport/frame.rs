//! WebSocket frame encoding and decoding (RFC 6455 subset).
//!
//! Only what a client talking to a trusted loopback peer needs:
//! single unfragmented frames, always-masked outbound frames, and
//! re-entrant decoding from a growing receive buffer.
//!
//! # Frame Layout
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |                     Masking key (if MASK set)                 |
//! +---------------------------------------------------------------+
//! |                          Payload Data                         |
//! +---------------------------------------------------------------+
//! ```

// ============================================================================
// Imports
// ============================================================================

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// FIN bit of the first header byte.
const FIN_BIT: u8 = 0x80;

/// MASK bit of the second header byte.
const MASK_BIT: u8 = 0x80;

/// Length marker for a 16-bit extended payload length.
const LEN_16: u8 = 126;

/// Length marker for a 64-bit extended payload length.
const LEN_64: u8 = 127;

/// Smallest payload that needs the 16-bit extended length.
pub const EXTENDED_16_THRESHOLD: usize = 126;

/// Smallest payload that needs the 64-bit extended length.
pub const EXTENDED_64_THRESHOLD: usize = 65_536;

// ============================================================================
// OpCode
// ============================================================================

/// Frame opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Continuation of a fragmented message (never produced).
    Continuation,
    /// UTF-8 text payload.
    Text,
    /// Binary payload.
    Binary,
    /// Connection close.
    Close,
    /// Ping.
    Ping,
    /// Pong.
    Pong,
    /// Reserved or unknown opcode.
    Other(u8),
}

impl OpCode {
    /// Decodes the low nibble of the first header byte.
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value & 0x0F {
            0x0 => Self::Continuation,
            0x1 => Self::Text,
            0x2 => Self::Binary,
            0x8 => Self::Close,
            0x9 => Self::Ping,
            0xA => Self::Pong,
            other => Self::Other(other),
        }
    }

    /// Returns the wire value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
            Self::Other(value) => value & 0x0F,
        }
    }
}

// ============================================================================
// Frame
// ============================================================================

/// A decoded frame with its payload already unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame opcode.
    pub opcode: OpCode,
    /// Unmasked payload bytes.
    pub payload: Bytes,
}

// ============================================================================
// Inbound
// ============================================================================

/// What the read loop has to act on after draining the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A complete UTF-8 text message.
    Text(String),
    /// A ping that must be answered with a pong carrying this payload.
    Ping(Bytes),
    /// The peer sent a close frame.
    Close,
}

// ============================================================================
// Masking
// ============================================================================

/// XORs `payload` in place with the 4-byte mask key.
///
/// Applying the same key twice restores the original bytes.
#[inline]
pub fn apply_mask(payload: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Appends a masked, FIN-terminated frame to `dst`.
///
/// The payload length uses the minimal width: 7-bit below 126,
/// 16-bit below 65536, 64-bit otherwise.
pub fn encode_masked(opcode: OpCode, payload: &[u8], mask: [u8; 4], dst: &mut BytesMut) {
    let len = payload.len();
    dst.reserve(14 + len);
    dst.put_u8(FIN_BIT | opcode.as_u8());

    if len < EXTENDED_16_THRESHOLD {
        dst.put_u8(MASK_BIT | len as u8);
    } else if len < EXTENDED_64_THRESHOLD {
        dst.put_u8(MASK_BIT | LEN_16);
        dst.put_u16(len as u16);
    } else {
        dst.put_u8(MASK_BIT | LEN_64);
        dst.put_u64(len as u64);
    }

    dst.put_slice(&mask);
    let start = dst.len();
    dst.put_slice(payload);
    apply_mask(&mut dst[start..], mask);
}

/// Encodes a text frame with a fresh random mask.
#[must_use]
pub fn encode_text(text: &str) -> BytesMut {
    let mut frame = BytesMut::new();
    encode_masked(OpCode::Text, text.as_bytes(), rand::random(), &mut frame);
    frame
}

/// Encodes a pong echoing a ping payload, with a fresh random mask.
#[must_use]
pub fn encode_pong(payload: &[u8]) -> BytesMut {
    let mut frame = BytesMut::new();
    encode_masked(OpCode::Pong, payload, rand::random(), &mut frame);
    frame
}

// ============================================================================
// Decoding
// ============================================================================

/// Removes one complete frame from the front of `buf`.
///
/// Returns `Ok(None)` without consuming anything when the header, the
/// extended length, the mask key, or the payload is not fully buffered yet.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the declared payload length cannot be
/// addressed on this platform.
pub fn decode(buf: &mut BytesMut) -> Result<Option<Frame>> {
    if buf.len() < 2 {
        return Ok(None);
    }

    let opcode = OpCode::from_u8(buf[0]);
    let masked = buf[1] & MASK_BIT != 0;

    let (declared_len, mut offset) = match buf[1] & 0x7F {
        LEN_16 => {
            if buf.len() < 4 {
                return Ok(None);
            }
            (u64::from(u16::from_be_bytes([buf[2], buf[3]])), 4)
        }
        LEN_64 => {
            if buf.len() < 10 {
                return Ok(None);
            }
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buf[2..10]);
            (u64::from_be_bytes(raw), 10)
        }
        len => (u64::from(len), 2),
    };

    let payload_len = usize::try_from(declared_len)
        .map_err(|_| Error::protocol(format!("frame payload of {declared_len} bytes is too large")))?;

    let mask = if masked {
        if buf.len() < offset + 4 {
            return Ok(None);
        }
        let key = [buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]];
        offset += 4;
        Some(key)
    } else {
        None
    };

    let frame_len = offset
        .checked_add(payload_len)
        .ok_or_else(|| Error::protocol("frame length overflow"))?;
    if buf.len() < frame_len {
        return Ok(None);
    }

    let mut payload = buf.split_to(frame_len);
    payload.advance(offset);
    if let Some(mask) = mask {
        apply_mask(&mut payload, mask);
    }

    Ok(Some(Frame {
        opcode,
        payload: payload.freeze(),
    }))
}

/// Decodes every complete frame currently in `buf`, in order.
///
/// Stops right after a close frame and leaves anything behind it in the
/// buffer. Non-UTF-8 text payloads and unhandled opcodes are dropped.
///
/// # Errors
///
/// Propagates [`decode`] errors.
pub fn drain(buf: &mut BytesMut) -> Result<Vec<Inbound>> {
    let mut inbound = Vec::new();

    while let Some(frame) = decode(buf)? {
        match frame.opcode {
            OpCode::Text => match String::from_utf8(frame.payload.to_vec()) {
                Ok(text) => inbound.push(Inbound::Text(text)),
                Err(_) => trace!(len = frame.payload.len(), "Dropped non-UTF-8 text frame"),
            },
            OpCode::Ping => inbound.push(Inbound::Ping(frame.payload)),
            OpCode::Close => {
                inbound.push(Inbound::Close);
                break;
            }
            other => trace!(opcode = other.as_u8(), "Ignored frame"),
        }
    }

    Ok(inbound)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    const MASK: [u8; 4] = [0x37, 0xFA, 0x21, 0x3D];

    /// Builds an unmasked server frame.
    fn server_frame(opcode: OpCode, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![FIN_BIT | opcode.as_u8()];
        let len = payload.len();
        if len < 126 {
            frame.push(len as u8);
        } else if len < 65_536 {
            frame.push(126);
            frame.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            frame.push(127);
            frame.extend_from_slice(&(len as u64).to_be_bytes());
        }
        frame.extend_from_slice(payload);
        frame
    }

    fn masked(opcode: OpCode, payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_masked(opcode, payload, MASK, &mut buf);
        buf
    }

    #[test]
    fn test_opcode_values() {
        assert_eq!(OpCode::from_u8(0x81), OpCode::Text);
        assert_eq!(OpCode::from_u8(0x88), OpCode::Close);
        assert_eq!(OpCode::from_u8(0x89), OpCode::Ping);
        assert_eq!(OpCode::from_u8(0x8A), OpCode::Pong);
        assert_eq!(OpCode::from_u8(0x83), OpCode::Other(0x3));
        assert_eq!(OpCode::Pong.as_u8(), 0xA);
    }

    #[test]
    fn test_encode_small_text_frame() {
        let frame = masked(OpCode::Text, b"Hi");
        assert_eq!(frame[0], 0x81);
        assert_eq!(frame[1], 0x80 | 2);
        assert_eq!(&frame[2..6], &MASK);
        assert_eq!(frame[6], b'H' ^ MASK[0]);
        assert_eq!(frame[7], b'i' ^ MASK[1]);
    }

    #[test]
    fn test_length_field_selection() {
        let cases = [
            (0usize, 0x80u8, 6usize),
            (125, 0x80 | 125, 6),
            (126, 0x80 | 126, 8),
            (65_535, 0x80 | 126, 8),
            (65_536, 0x80 | 127, 14),
        ];

        for (len, len_byte, header_len) in cases {
            let payload = vec![b'a'; len];
            let frame = masked(OpCode::Text, &payload);
            assert_eq!(frame[1], len_byte, "length byte for {len}");
            assert_eq!(frame.len(), header_len + len, "frame size for {len}");
        }
    }

    #[test]
    fn test_extended_length_is_big_endian() {
        let frame = masked(OpCode::Text, &vec![0u8; 300]);
        assert_eq!(&frame[2..4], &300u16.to_be_bytes());

        let frame = masked(OpCode::Text, &vec![0u8; 70_000]);
        assert_eq!(&frame[2..10], &70_000u64.to_be_bytes());
    }

    #[test]
    fn test_masked_round_trip_at_boundaries() {
        for len in [0usize, 125, 126, 65_535, 65_536] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let mut buf = masked(OpCode::Text, &payload);

            let frame = decode(&mut buf).expect("decode").expect("complete frame");
            assert_eq!(frame.opcode, OpCode::Text);
            assert_eq!(frame.payload.as_ref(), payload.as_slice(), "payload of {len}");
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn test_decode_incomplete_consumes_nothing() {
        let full = server_frame(OpCode::Text, &vec![b'x'; 200]);

        for cut in [0, 1, 2, 3, 50, full.len() - 1] {
            let mut buf = BytesMut::from(&full[..cut]);
            assert!(decode(&mut buf).expect("decode").is_none());
            assert_eq!(buf.len(), cut);
        }
    }

    #[test]
    fn test_decode_waits_for_mask_key() {
        let full = masked(OpCode::Text, b"hello");
        let mut buf = BytesMut::from(&full[..4]);
        assert!(decode(&mut buf).expect("decode").is_none());
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_drain_two_frames_in_order() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&server_frame(OpCode::Text, b"first"));
        buf.extend_from_slice(&server_frame(OpCode::Text, b"second"));

        let inbound = drain(&mut buf).expect("drain");
        assert_eq!(
            inbound,
            vec![
                Inbound::Text("first".to_string()),
                Inbound::Text("second".to_string())
            ]
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_drain_keeps_trailing_partial_frame() {
        let second = server_frame(OpCode::Text, b"second");
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&server_frame(OpCode::Text, b"first"));
        buf.extend_from_slice(&second[..3]);

        let inbound = drain(&mut buf).expect("drain");
        assert_eq!(inbound, vec![Inbound::Text("first".to_string())]);
        assert_eq!(buf.as_ref(), &second[..3]);
    }

    #[test]
    fn test_drain_stops_at_close() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&server_frame(OpCode::Close, &[0x03, 0xE8]));
        buf.extend_from_slice(&server_frame(OpCode::Text, b"late"));

        let inbound = drain(&mut buf).expect("drain");
        assert_eq!(inbound, vec![Inbound::Close]);
        assert!(!buf.is_empty());
    }

    #[test]
    fn test_drain_surfaces_ping_payload() {
        let mut buf = BytesMut::from(&server_frame(OpCode::Ping, b"beat")[..]);
        let inbound = drain(&mut buf).expect("drain");
        assert_eq!(inbound, vec![Inbound::Ping(Bytes::from_static(b"beat"))]);
    }

    #[test]
    fn test_pong_echoes_ping_payload() {
        let mut pong = encode_pong(b"beat");
        assert_eq!(pong[0], 0x8A);
        assert_ne!(pong[1] & MASK_BIT, 0);

        let frame = decode(&mut pong).expect("decode").expect("complete");
        assert_eq!(frame.opcode, OpCode::Pong);
        assert_eq!(frame.payload.as_ref(), b"beat");
    }

    #[test]
    fn test_drain_drops_invalid_utf8_and_unknown_opcodes() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&server_frame(OpCode::Text, &[0xFF, 0xFE]));
        buf.extend_from_slice(&server_frame(OpCode::Binary, b"bin"));
        buf.extend_from_slice(&server_frame(OpCode::Pong, b""));
        buf.extend_from_slice(&server_frame(OpCode::Text, b"ok"));

        let inbound = drain(&mut buf).expect("drain");
        assert_eq!(inbound, vec![Inbound::Text("ok".to_string())]);
    }

    #[test]
    fn test_encode_text_masks_randomly() {
        let frame = encode_text("payload");
        assert_eq!(frame[0], 0x81);
        assert_eq!(frame[1], 0x80 | 7);

        let mut buf = frame;
        let decoded = decode(&mut buf).expect("decode").expect("complete");
        assert_eq!(decoded.payload.as_ref(), b"payload");
    }

    proptest! {
        #[test]
        fn prop_byte_at_a_time_yields_one_message(text in "[a-zA-Z0-9 ]{0,400}") {
            let wire = server_frame(OpCode::Text, text.as_bytes());
            let mut buf = BytesMut::new();
            let mut messages = Vec::new();

            for byte in &wire {
                buf.extend_from_slice(&[*byte]);
                messages.extend(drain(&mut buf).expect("drain"));
            }

            prop_assert_eq!(messages, vec![Inbound::Text(text)]);
            prop_assert!(buf.is_empty());
        }

        #[test]
        fn prop_arbitrary_chunking_matches_single_feed(
            text in "\\PC{0,300}",
            chunk in 1usize..64,
        ) {
            let mut wire = masked(OpCode::Text, text.as_bytes()).to_vec();
            wire.extend_from_slice(&server_frame(OpCode::Text, b"tail"));

            let mut whole = BytesMut::from(&wire[..]);
            let expected = drain(&mut whole).expect("drain");

            let mut buf = BytesMut::new();
            let mut chunked = Vec::new();
            for piece in wire.chunks(chunk) {
                buf.extend_from_slice(piece);
                chunked.extend(drain(&mut buf).expect("drain"));
            }

            prop_assert_eq!(chunked, expected);
            prop_assert!(buf.is_empty());
        }
    }
}
