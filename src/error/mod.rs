//! Error types for the sync layer.

use thiserror::Error;

/// Sync-layer errors. Contained at the layer that detects them and turned into
/// log lines or store state; never surfaced as panics.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Channel not connected: {0}")]
    NotConnected(String),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid channel name: {0}")]
    InvalidChannel(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        SyncError::Transport(e.to_string())
    }
}

impl From<crate::config::ConfigLoadError> for SyncError {
    fn from(e: crate::config::ConfigLoadError) -> Self {
        SyncError::Config(e.to_string())
    }
}

impl From<validator::ValidationErrors> for SyncError {
    fn from(e: validator::ValidationErrors) -> Self {
        SyncError::Validation(e.to_string())
    }
}

impl SyncError {
    /// Whether retrying the same operation later can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::Transport(_) | SyncError::NotConnected(_) | SyncError::Api(_)
        )
    }

    /// Short text for an inline, dismissible banner.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Transport(_) | SyncError::NotConnected(_) => {
                "Connection lost. Reconnecting…".to_string()
            }
            SyncError::Unauthenticated => "Please log in again.".to_string(),
            SyncError::Validation(msg) => msg.clone(),
            SyncError::Api(msg) => format!("Request failed: {}", msg),
            SyncError::Config(_)
            | SyncError::Serialization(_)
            | SyncError::InvalidChannel(_)
            | SyncError::Internal(_) => "Something went wrong.".to_string(),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(SyncError::Transport("reset".into()).is_transient());
        assert!(SyncError::Api("503".into()).is_transient());
        assert!(!SyncError::Unauthenticated.is_transient());
        assert!(!SyncError::Validation("empty".into()).is_transient());
    }

    #[test]
    fn config_errors_convert() {
        let e = SyncError::from(crate::config::ConfigLoadError::InvalidNumber(
            "RECONNECT_DELAY_SECS",
        ));
        assert!(matches!(e, SyncError::Config(ref msg) if msg.contains("RECONNECT_DELAY_SECS")));
        assert!(!e.is_transient());
    }

    #[test]
    fn user_message_for_connection_errors() {
        let msg = SyncError::NotConnected("chat:alice".into()).user_message();
        assert!(msg.contains("Reconnecting"));
    }
}
