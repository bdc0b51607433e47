//! Client configuration loaded from environment.

use std::time::Duration;

use crate::auth::AuthToken;

/// Default WebSocket base, matching the development backend.
pub const DEFAULT_WS_BASE_URL: &str = "ws://127.0.0.1:8000/ws";

/// Sync-layer configuration loaded from `.env` and environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket base URL without trailing slash (e.g. `ws://127.0.0.1:8000/ws`).
    pub ws_base_url: String,
    /// Auth token for real-time channels. `None` means no channel ever opens.
    pub auth_token: Option<AuthToken>,
    /// Fixed delay before the single reconnect attempt after a close.
    pub reconnect_delay: Duration,
    /// Keep-alive period while connected.
    pub heartbeat_interval: Duration,
    /// Maximum retained chat entries per live stream.
    pub stream_chat_capacity: usize,
    /// Log level: `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ws_base_url: DEFAULT_WS_BASE_URL.to_string(),
            auth_token: None,
            reconnect_delay: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(30),
            stream_chat_capacity: 50,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment. Call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let defaults = Self::default();

        let ws_base_url = std::env::var("WS_BASE_URL")
            .unwrap_or(defaults.ws_base_url)
            .trim_end_matches('/')
            .to_string();
        if !(ws_base_url.starts_with("ws://") || ws_base_url.starts_with("wss://")) {
            return Err(ConfigLoadError::InvalidWsBaseUrl(ws_base_url));
        }

        let auth_token = std::env::var("AUTH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(AuthToken::new);

        let reconnect_delay = Duration::from_secs(parse_var(
            "RECONNECT_DELAY_SECS",
            defaults.reconnect_delay.as_secs(),
        )?);
        let heartbeat_interval = Duration::from_secs(parse_var(
            "HEARTBEAT_INTERVAL_SECS",
            defaults.heartbeat_interval.as_secs(),
        )?);
        if heartbeat_interval.is_zero() {
            return Err(ConfigLoadError::InvalidNumber("HEARTBEAT_INTERVAL_SECS"));
        }
        let stream_chat_capacity =
            parse_var("STREAM_CHAT_CAPACITY", defaults.stream_chat_capacity as u64)? as usize;
        let log_level = std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Self {
            ws_base_url,
            auth_token,
            reconnect_delay,
            heartbeat_interval,
            stream_chat_capacity,
            log_level,
        })
    }
}

fn parse_var(name: &'static str, default: u64) -> Result<u64, ConfigLoadError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigLoadError::InvalidNumber(name)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Invalid WS_BASE_URL: {0}")]
    InvalidWsBaseUrl(String),
    #[error("Invalid number in {0}")]
    InvalidNumber(&'static str),
}
