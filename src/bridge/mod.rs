//! # Bridge Orchestrator
//!
//! The top-level loop tying the protocol layer to the backend: read a frame,
//! dispatch to the backend with the keepalive signaler running, write the
//! response frame (or an `ERROR:` frame), repeat. Messages are processed
//! strictly one at a time; the keepalive task is the only other unit of work
//! and only for the span of a backend call.
//!
//! Nothing that happens inside a single exchange may take the bridge down.
//! Backend failures are an ordinary branch; anything unexpected is caught at
//! the loop boundary, reported to the peer, and the loop continues. Only an
//! operator interrupt exits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};
use tokio::time::sleep;

use crate::backend::CompletionBackend;
use crate::codec::LegacyCodec;
use crate::config::Config;
use crate::logutil::truncate_for_log;
use crate::protocol::keepalive::KeepaliveSession;
use crate::protocol::{FrameReader, FrameWriter, ERROR_PREFIX};
use crate::serial::SharedLink;

pub mod history;

use history::ConversationHistory;

/// Receipt log preview length, bytes.
const RECEIPT_PREVIEW: usize = 50;

/// Bridge between the serial terminal and the chat-completion backend.
/// Owns all mutable state for the lifetime of the process: the shared link,
/// the frame reader/writer, and the conversation history (reset only on
/// restart; there is no persistence).
pub struct ChatBridge<B> {
    link: SharedLink,
    reader: FrameReader,
    writer: FrameWriter,
    backend: B,
    history: ConversationHistory,
    system_prompt: String,
    keepalive_interval: Duration,
}

impl<B: CompletionBackend> ChatBridge<B> {
    pub fn new(link: SharedLink, backend: B, config: &Config) -> Self {
        let codec = LegacyCodec::for_label(&config.serial.charset);
        if codec.is_fallback() {
            warn!(
                "Unknown charset label '{}', falling back to ASCII transliteration",
                config.serial.charset
            );
        } else {
            info!("Peer charset: {}", codec.name());
        }
        let poll_interval = Duration::from_millis(config.bridge.poll_interval_ms);
        Self {
            reader: FrameReader::new(Arc::clone(&link), codec, poll_interval),
            writer: FrameWriter::new(Arc::clone(&link), codec),
            link,
            backend,
            history: ConversationHistory::new(config.bridge.history_max_entries),
            system_prompt: config.bridge.system_prompt.clone(),
            keepalive_interval: Duration::from_secs(config.bridge.keepalive_interval_secs),
        }
    }

    /// Main message processing loop. Runs until an operator interrupt.
    pub async fn run(&mut self) -> Result<()> {
        info!("Bridge ready. Waiting for messages...");
        loop {
            tokio::select! {
                result = self.process_next() => {
                    match result {
                        Ok(_) => {}
                        Err(e) => {
                            // Loop-level catch: report to the peer and keep
                            // going. A single bad exchange must never crash
                            // the bridge.
                            error!("Error in main loop: {e:#}");
                            let frame = format!("{ERROR_PREFIX} {e}");
                            if let Err(we) = self.writer.write_frame(&frame) {
                                error!("Failed to send error frame: {we:#}");
                            }
                            // Small delay to prevent tight error loops
                            sleep(Duration::from_millis(100)).await;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Poll once for a frame; when a complete non-empty message is ready,
    /// run one full exchange. Returns whether an exchange ran. Empty frames
    /// (lone terminator) are dropped here, never forwarded to the backend.
    pub async fn process_next(&mut self) -> Result<bool> {
        let message = match self.reader.poll_frame().await? {
            Some(m) if !m.is_empty() => m,
            _ => return Ok(false),
        };
        self.handle_exchange(message).await?;
        Ok(true)
    }

    /// One request/response exchange: keepalive running for exactly the span
    /// of the backend call, joined before the response frame is written, on
    /// success and failure alike.
    async fn handle_exchange(&mut self, message: String) -> Result<()> {
        info!("Received: {}", truncate_for_log(&message, RECEIPT_PREVIEW));

        let request = self.history.build_request(&self.system_prompt, &message);
        let keepalive = KeepaliveSession::start(Arc::clone(&self.link), self.keepalive_interval);
        let result = self.backend.complete(&request).await;
        keepalive.stop().await;

        let response = match result {
            Ok(assistant_message) => {
                self.history.record_exchange(&message, &assistant_message);
                assistant_message
            }
            Err(e) => {
                warn!("Backend error: {}", e);
                format!("{ERROR_PREFIX} {e}")
            }
        };

        self.writer.write_frame(&response)?;
        info!("Sent response ({} chars)", response.chars().count());
        Ok(())
    }

    /// Current rolling history (diagnostics and tests).
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }
}
