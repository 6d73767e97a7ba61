//! Error types for the interop driver
//!
//! Messages name the status line or command involved so a failed run can be
//! diagnosed from the console output alone.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the interop driver
#[derive(Error, Debug)]
pub enum Error {
    // === Session Errors ===
    #[error("No automation session given. Pass --session <id> or set defaults.session in config.toml")]
    SessionMissing,

    // === Transport Errors ===
    #[error("Automation transport '{program}' not found on PATH")]
    TransportNotFound { program: String },

    #[error("Transport {op} failed: {message}")]
    Transport { op: String, message: String },

    // === Screen Matching Errors ===
    #[error("Timed out after {secs} seconds waiting for '{text}'")]
    WaitTimeout { text: String, secs: u64 },

    #[error("Could not extract public key from snapshot (expected 'Hex: ' followed by 64 lowercase hex characters)")]
    ExtractionFailed,

    #[error("Invalid public key '{0}': expected 64 lowercase hex characters")]
    InvalidPublicKey(String),

    // === Scenario Errors ===
    #[error("Invalid scenario transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Scenario failed: {0}")]
    ScenarioFailed(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a transport failure for the given operation
    pub fn transport(op: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            op: op.to_string(),
            message: message.into(),
        }
    }

    /// Create a wait timeout error
    pub fn wait_timeout(text: &str, secs: u64) -> Self {
        Self::WaitTimeout {
            text: text.to_string(),
            secs,
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Whether this error is a status-line wait that ran out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::WaitTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_timeout_message() {
        let err = Error::wait_timeout("Connected", 5);
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Timed out after 5 seconds waiting for 'Connected'"
        );
    }

    #[test]
    fn test_transport_error_is_not_timeout() {
        let err = Error::transport("send-keys", "broken pipe");
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "Transport send-keys failed: broken pipe");
    }
}
