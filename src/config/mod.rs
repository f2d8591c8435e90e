//! # Configuration Management
//!
//! TOML configuration with environment-variable substitution: any `${VAR}`
//! occurrence in the raw file is replaced with the process environment value
//! before parsing, so secrets like the backend API key stay out of the file:
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//!
//! [backend]
//! api_key = "${OPENAI_API_KEY}"
//! model = "gpt-4o-mini"
//!
//! [bridge]
//! system_prompt = "You are chatting with a vintage computer user."
//! ```
//!
//! Sections:
//!
//! - [`SerialConfig`] - port path, bit rate, framing parameters, charset
//! - [`BackendConfig`] - endpoint, credentials, model, limits
//! - [`BridgeConfig`] - keepalive/poll intervals, history cap, system prompt
//! - [`LoggingConfig`] - level and optional log file

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub serial: SerialConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port settings. Framing parameters default to 8N1, the native mode
/// of the terminal devices this bridge targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_parity")]
    pub parity: String,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// WHATWG encoding label for the peer's charset. Unknown labels fall
    /// back to ASCII transliteration at codec construction.
    #[serde(default = "default_charset")]
    pub charset: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Fixed system entry prepended to every backend request; never stored
    /// in the rolling history.
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Rolling history cap in messages (two per exchange). Odd values are
    /// rounded down; entries only exist in pairs.
    #[serde(default = "default_history_max_entries")]
    pub history_max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

fn default_data_bits() -> u8 {
    8
}

fn default_parity() -> String {
    "none".to_string()
}

fn default_stop_bits() -> u8 {
    1
}

fn default_charset() -> String {
    "shift_jis".to_string()
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_seconds() -> u32 {
    120
}

fn default_keepalive_interval_secs() -> u64 {
    5
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_history_max_entries() -> usize {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            history_max_entries: default_history_max_entries(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file, substituting `${VAR}` references from
    /// the process environment before parsing.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let content = substitute_env(&content);
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            serial: SerialConfig {
                port: "/dev/ttyUSB0".to_string(),
                baud_rate: 9600,
                data_bits: default_data_bits(),
                parity: default_parity(),
                stop_bits: default_stop_bits(),
                charset: default_charset(),
            },
            backend: BackendConfig {
                api_url: default_api_url(),
                api_key: "${OPENAI_API_KEY}".to_string(),
                model: "gpt-4o-mini".to_string(),
                max_tokens: default_max_tokens(),
                timeout_seconds: default_timeout_seconds(),
            },
            bridge: BridgeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Replace every `${VAR}` occurrence with the matching environment value.
/// Unset variables are left verbatim so a missing key is visible downstream
/// (an api_key still starting with `${` fails the startup check).
fn substitute_env(content: &str) -> String {
    let mut out = content.to_string();
    for (key, value) in std::env::vars() {
        out = out.replace(&format!("${{{key}}}"), &value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.serial.port, config.serial.port);
        assert_eq!(parsed.backend.model, config.backend.model);
        assert_eq!(parsed.bridge.keepalive_interval_secs, 5);
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let toml_text = r#"
            [serial]
            port = "/dev/ttyS1"
            baud_rate = 19200

            [backend]
            api_key = "sk-test"
            model = "gpt-4o-mini"
        "#;
        let config: Config = toml::from_str(toml_text).unwrap();
        assert_eq!(config.serial.data_bits, 8);
        assert_eq!(config.serial.parity, "none");
        assert_eq!(config.serial.stop_bits, 1);
        assert_eq!(config.serial.charset, "shift_jis");
        assert_eq!(config.bridge.poll_interval_ms, 10);
        assert_eq!(config.bridge.history_max_entries, 20);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn env_substitution_replaces_known_vars() {
        std::env::set_var("CHATBRIDGE_TEST_KEY", "sk-from-env");
        let out = substitute_env("api_key = \"${CHATBRIDGE_TEST_KEY}\"");
        assert_eq!(out, "api_key = \"sk-from-env\"");
    }

    #[test]
    fn env_substitution_leaves_unset_vars_verbatim() {
        let out = substitute_env("api_key = \"${CHATBRIDGE_DEFINITELY_UNSET}\"");
        assert_eq!(out, "api_key = \"${CHATBRIDGE_DEFINITELY_UNSET}\"");
    }
}
