//! # Chatbridge - Serial Chat Bridge for Legacy Terminals
//!
//! Chatbridge relays text messages between a byte-oriented serial terminal
//! (a legacy device speaking a single/double-byte charset such as Shift_JIS)
//! and a chat-completion HTTP backend. The serial side uses a minimal framing
//! protocol: payload bytes terminated by a single 0x04 byte, with a 0x00
//! keepalive byte emitted between frames while a slow backend call is in
//! flight so the terminal never mistakes network latency for a dead link.
//!
//! ## Features
//!
//! - **ETX Framing**: Incremental frame assembly from arbitrary serial read
//!   chunks, terminator byte 0x04, empty frames dropped.
//! - **Legacy Charset Codec**: Shift_JIS (or any configured encoding label)
//!   with byte-preserving fallback decoding and replacement-on-failure
//!   encoding - the codec never rejects input in either direction.
//! - **Keepalive Signaler**: A scoped tokio task emitting a flushed 0x00
//!   byte at a fixed interval for exactly the duration of a backend call,
//!   joined before the response frame is written.
//! - **Conversation History**: A bounded rolling window of user/assistant
//!   exchange pairs prepended to every backend request.
//! - **Echo Harness**: A diagnostic `echo` subcommand exercising the full
//!   serial path without a backend.
//! - **Async Design**: Built with Tokio; one sequential bridge loop plus the
//!   single keepalive task.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatbridge::backend::HttpBackend;
//! use chatbridge::bridge::ChatBridge;
//! use chatbridge::config::Config;
//! use chatbridge::serial;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let link = serial::open(&config.serial)?;
//!     let backend = HttpBackend::new(config.backend.clone());
//!     let mut bridge = ChatBridge::new(link, backend, &config);
//!     bridge.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`bridge`] - Orchestrator loop and conversation history
//! - [`protocol`] - Frame reader/writer and the keepalive signaler
//! - [`codec`] - Legacy charset conversion
//! - [`serial`] - Serial transport collaborator
//! - [`backend`] - Chat-completion backend collaborator
//! - [`config`] - Configuration management
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Chat Bridge    │ ← Orchestrator + history
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Protocol       │ ← Framing, codec, keepalive
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Serial Link    │ ← Shared transport (single-writer lock)
//! └─────────────────┘
//! ```

pub mod backend;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod logutil;
pub mod protocol;
pub mod serial;
