//! # Chat-Completion Backend
//!
//! Collaborator for the remote chat-completion service. The bridge only
//! cares about the interface: an ordered list of role-tagged messages goes
//! in, one assistant message (or a structured error) comes out. Latency is
//! unbounded from the bridge's point of view - the keepalive signaler, not
//! this module, is what keeps the serial peer happy in the meantime.
//!
//! Backend failure is an ordinary branch for the orchestrator, not an
//! exceptional one, so `complete` returns a typed [`BackendError`] whose
//! `Display` text is exactly what goes after `ERROR:` on the wire.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;

use crate::config::BackendConfig;
use crate::logutil::truncate_for_log;

/// Message role in a chat-completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Why a backend call produced no assistant message.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("timeout after {0}s")]
    Timeout(u64),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned status {status}: {detail}")]
    Api { status: u16, detail: String },
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

/// The seam the orchestrator calls through; tests substitute a scripted
/// implementation.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Request one assistant completion for the given ordered messages.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, BackendError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    // The service returns null content for some refusal/tool paths; treat
    // that the same as a missing field.
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client.
pub struct HttpBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
        };
        debug!(
            "Backend request: model={} messages={}",
            self.config.model,
            messages.len()
        );

        let send = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send();
        let timeout_secs = self.config.timeout_seconds as u64;
        let response = timeout(Duration::from_secs(timeout_secs), send)
            .await
            .map_err(|_| BackendError::Timeout(timeout_secs))??;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                detail: truncate_for_log(&detail, 200),
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::Malformed("no assistant choice in response".into()))?;

        debug!("Backend response: {} chars", content.len());
        Ok(content)
    }
}
