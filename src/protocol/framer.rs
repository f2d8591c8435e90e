//! Terminator-delimited framer for the serial chat link.
//!
//! Wire frames are:
//!
//!   `<payload bytes> 0x04`
//!
//! This module provides a small incremental framer that can be fed arbitrary
//! read chunks and yields whole payloads when the terminator arrives. Bytes
//! after a terminator stay buffered for the next frame, so chunk boundaries
//! never affect message boundaries.

use bytes::{Buf, BytesMut};

use super::FRAME_TERMINATOR;

/// Incremental terminator-delimited frame decoder.
/// Payloads may be empty (a lone terminator); the caller decides whether an
/// empty payload is meaningful. The terminator itself is never part of a
/// payload.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(1024),
        }
    }

    /// Append raw bytes read from the transport.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Attempt to extract the next complete frame payload. Returns
    /// `Some(payload)` when a terminator has been seen, otherwise `None`.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let pos = self.buf.iter().position(|&b| b == FRAME_TERMINATOR)?;
        let payload = self.buf.split_to(pos).to_vec();
        self.buf.advance(1); // discard the terminator itself
        Some(payload)
    }

    /// True while a partial frame (bytes without a terminator yet) is
    /// buffered. The reader uses this to distinguish "no message yet" from
    /// "message in progress".
    pub fn in_progress(&self) -> bool {
        !self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::FrameDecoder;

    #[test]
    fn single_frame_in_one_chunk() {
        let mut dec = FrameDecoder::new();
        dec.push(b"Hello\x04");
        assert_eq!(dec.next_frame(), Some(b"Hello".to_vec()));
        assert_eq!(dec.next_frame(), None);
        assert!(!dec.in_progress());
    }

    #[test]
    fn frame_split_across_chunks() {
        let mut dec = FrameDecoder::new();
        dec.push(b"Hel");
        assert_eq!(dec.next_frame(), None);
        assert!(dec.in_progress());
        dec.push(b"lo");
        assert_eq!(dec.next_frame(), None);
        dec.push(b"\x04");
        assert_eq!(dec.next_frame(), Some(b"Hello".to_vec()));
    }

    #[test]
    fn byte_at_a_time_delivery() {
        let mut dec = FrameDecoder::new();
        let wire = b"chunked\x04";
        let mut frames = Vec::new();
        for &b in wire.iter() {
            dec.push(&[b]);
            while let Some(f) = dec.next_frame() {
                frames.push(f);
            }
        }
        assert_eq!(frames, vec![b"chunked".to_vec()]);
    }

    #[test]
    fn two_frames_in_one_chunk() {
        let mut dec = FrameDecoder::new();
        dec.push(b"one\x04two\x04");
        assert_eq!(dec.next_frame(), Some(b"one".to_vec()));
        assert_eq!(dec.next_frame(), Some(b"two".to_vec()));
        assert_eq!(dec.next_frame(), None);
    }

    #[test]
    fn trailing_bytes_stay_buffered() {
        let mut dec = FrameDecoder::new();
        dec.push(b"one\x04tw");
        assert_eq!(dec.next_frame(), Some(b"one".to_vec()));
        assert_eq!(dec.next_frame(), None);
        assert!(dec.in_progress());
        dec.push(b"o\x04");
        assert_eq!(dec.next_frame(), Some(b"two".to_vec()));
    }

    #[test]
    fn empty_frame_yields_empty_payload() {
        let mut dec = FrameDecoder::new();
        dec.push(b"\x04");
        assert_eq!(dec.next_frame(), Some(Vec::new()));
    }
}
