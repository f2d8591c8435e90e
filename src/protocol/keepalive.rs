//! Keepalive signaler: a scoped timer task that keeps the serial peer
//! satisfied while a backend call is in flight.
//!
//! The peer's client drops the link if it sees silence for too long, so for
//! the duration of every backend call the bridge emits a lone 0x00 byte at a
//! fixed interval. The session is strictly scoped to one call: started
//! immediately before it, stopped and joined immediately after, success or
//! failure. After [`KeepaliveSession::stop`] returns, the task has fully
//! quiesced and will write no further bytes - the caller is then free to
//! write the response frame without any interleaving risk.

use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::serial::SharedLink;

use super::KEEPALIVE_BYTE;

/// Handle for one running keepalive signaler. At most one session exists at
/// a time; the bridge processes a single request at a time and each session
/// lives inside exactly one backend call.
pub struct KeepaliveSession {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl KeepaliveSession {
    /// Spawn the signaler. The first byte goes out one full `interval` after
    /// the session starts, then every `interval` until stopped.
    pub fn start(link: SharedLink, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        // Emission failures are logged and swallowed: a bad
                        // keepalive write must never abort the backend call
                        // it is guarding.
                        let result = match link.lock() {
                            Ok(mut port) => port.write_flush(&[KEEPALIVE_BYTE]),
                            Err(_) => {
                                warn!("Keepalive skipped: serial link lock poisoned");
                                continue;
                            }
                        };
                        match result {
                            Ok(()) => debug!("Sent keepalive"),
                            Err(e) => warn!("Failed to send keepalive: {}", e),
                        }
                    }
                }
            }
        });
        Self { stop_tx, task }
    }

    /// Stop the signaler and wait for it to fully quiesce. This blocks until
    /// the task has exited; once it returns, no further keepalive byte will
    /// ever reach the wire from this session.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            // Only reachable if the task panicked; nothing to clean up.
            warn!("Keepalive task join error: {}", e);
        }
    }
}
