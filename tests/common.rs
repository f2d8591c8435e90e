//! Test utilities & fixtures.
//! In-memory serial link plus a scripted backend so integration tests can
//! drive the whole bridge without a device or network.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::sleep;

use chatbridge::backend::{BackendError, ChatMessage, CompletionBackend};
use chatbridge::serial::{SerialLink, SharedLink};

#[derive(Default)]
struct MemoryState {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
}

/// In-memory serial link. Tests push inbound bytes and inspect what the
/// bridge wrote; clones share the same buffers.
#[derive(Clone, Default)]
pub struct MemoryLink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a clone of this link as the bridge-facing shared handle.
    pub fn shared(&self) -> SharedLink {
        Arc::new(Mutex::new(Box::new(self.clone()) as Box<dyn SerialLink>))
    }

    /// Queue bytes for the bridge to read.
    #[allow(dead_code)]
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.state.lock().unwrap().inbound.extend(bytes.iter().copied());
    }

    /// Everything the bridge has written so far.
    #[allow(dead_code)]
    pub fn outbound(&self) -> Vec<u8> {
        self.state.lock().unwrap().outbound.clone()
    }

    /// Drain the outbound capture (for multi-step assertions).
    #[allow(dead_code)]
    pub fn take_outbound(&self) -> Vec<u8> {
        std::mem::take(&mut self.state.lock().unwrap().outbound)
    }
}

impl SerialLink for MemoryLink {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        Ok(self.state.lock().unwrap().inbound.len())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        let mut n = 0;
        while n < buf.len() {
            match state.inbound.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn write_flush(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.state.lock().unwrap().outbound.extend_from_slice(bytes);
        Ok(())
    }
}

/// Backend stand-in driven by a script of canned results. When the script
/// runs dry it echoes the last user message (`re: <content>`), which keeps
/// long-run tests deterministic while still distinguishing exchanges.
/// Clones share the script and the request capture.
#[derive(Clone)]
pub struct ScriptedBackend {
    script: Arc<Mutex<VecDeque<Result<String, BackendError>>>>,
    requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    delay: std::time::Duration,
}

impl ScriptedBackend {
    /// Backend that echoes every request (empty script).
    #[allow(dead_code)]
    pub fn echoing() -> Self {
        Self::with_script(Vec::new())
    }

    #[allow(dead_code)]
    pub fn with_script(steps: Vec<Result<String, BackendError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(steps.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
            delay: std::time::Duration::ZERO,
        }
    }

    /// Simulate backend latency; with a paused test clock this is what lets
    /// keepalives fire during the call.
    #[allow(dead_code)]
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every message list the backend was called with, in order.
    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if let Some(step) = self.script.lock().unwrap().pop_front() {
            return step;
        }
        let last = messages.last().expect("request never empty");
        Ok(format!("re: {}", last.content))
    }
}
