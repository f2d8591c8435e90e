//! # Wire Protocol
//!
//! Byte-level message framing and liveness for the serial peer.
//!
//! A frame is a run of payload bytes in the peer's native encoding,
//! terminated by a single 0x04 byte. Between frames - and only between
//! frames - the bridge may emit a lone 0x00 byte as a liveness signal while
//! a backend call is in flight; the peer treats it as a no-op. The shared
//! link mutex guarantees a keepalive byte can never land inside a frame:
//! every frame goes out in one locked write.
//!
//! Components:
//!
//! - [`framer::FrameDecoder`] - incremental terminator-delimited decoder
//! - [`FrameReader`] - polls the link, assembles frames, decodes payloads
//! - [`FrameWriter`] - encodes and emits one frame atomically
//! - [`keepalive::KeepaliveSession`] - the scoped liveness task

use std::time::Duration;

use anyhow::{anyhow, Result};
use log::trace;
use tokio::time::sleep;

use crate::codec::LegacyCodec;
use crate::serial::SharedLink;

pub mod framer;
pub mod keepalive;

use framer::FrameDecoder;

/// End-of-frame sentinel byte (EOT).
pub const FRAME_TERMINATOR: u8 = 0x04;

/// Liveness sentinel byte (NUL), only ever emitted between frames.
pub const KEEPALIVE_BYTE: u8 = 0x00;

/// Literal prefix for failure frames; the peer shows these verbatim.
pub const ERROR_PREFIX: &str = "ERROR:";

/// Reads frames from the shared link.
///
/// `poll_frame` is driven repeatedly by the bridge loop. It returns quickly
/// with `Ok(None)` while the line is idle so the caller stays responsive to
/// shutdown, but once a partial frame is buffered it keeps polling until the
/// terminator arrives - a message in progress must eventually complete.
pub struct FrameReader {
    link: SharedLink,
    codec: LegacyCodec,
    decoder: FrameDecoder,
    poll_interval: Duration,
}

impl FrameReader {
    pub fn new(link: SharedLink, codec: LegacyCodec, poll_interval: Duration) -> Self {
        Self {
            link,
            codec,
            decoder: FrameDecoder::new(),
            poll_interval,
        }
    }

    /// Poll for the next decoded message.
    ///
    /// - `Ok(Some(text))` - a frame completed; `text` may be empty (empty
    ///   frame), which the caller must drop rather than forward.
    /// - `Ok(None)` - nothing pending and no frame in progress; returned
    ///   after one short poll sleep.
    pub async fn poll_frame(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(payload) = self.decoder.next_frame() {
                trace!("Frame complete: {} payload bytes", payload.len());
                return Ok(Some(self.codec.decode(&payload)));
            }

            let mut buffer = [0u8; 1024];
            let read = {
                let mut link = self
                    .link
                    .lock()
                    .map_err(|_| anyhow!("Serial link lock poisoned"))?;
                link.read_available(&mut buffer)?
            };

            if read > 0 {
                self.decoder.push(&buffer[..read]);
                continue;
            }

            // No data pending. Idle line: hand control back after a short
            // sleep. Partial frame: keep waiting for the terminator.
            sleep(self.poll_interval).await;
            if !self.decoder.in_progress() {
                return Ok(None);
            }
        }
    }
}

/// Writes frames to the shared link.
pub struct FrameWriter {
    link: SharedLink,
    codec: LegacyCodec,
}

impl FrameWriter {
    pub fn new(link: SharedLink, codec: LegacyCodec) -> Self {
        Self { link, codec }
    }

    /// Encode `text`, append the terminator, and flush - all in a single
    /// locked write so a concurrent keepalive byte cannot interleave.
    pub fn write_frame(&self, text: &str) -> Result<()> {
        let mut wire = self.codec.encode(text);
        wire.push(FRAME_TERMINATOR);
        let mut link = self
            .link
            .lock()
            .map_err(|_| anyhow!("Serial link lock poisoned"))?;
        link.write_flush(&wire)?;
        trace!("Frame written: {} bytes", wire.len());
        Ok(())
    }
}
