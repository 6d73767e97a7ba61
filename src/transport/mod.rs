//! Automation transport seam
//!
//! The driver never talks to a terminal directly. It delivers keys to a
//! remote-controlled session and reads back a text rendering of the screen
//! through a [`Transport`].

mod command;
mod mock;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::Result;

pub use command::CommandTransport;
pub use mock::{MockScript, MockTransport};

/// Opaque identifier of one remote-controlled terminal session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single input delivered to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// Literal text typed as-is
    Text(String),
    Enter,
    Space,
    Tab,
    Escape,
    Up,
    Down,
    Backspace,
}

impl Key {
    /// Literal text input
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Parse a key name, falling back to literal text
    pub fn parse(s: &str) -> Self {
        match s {
            "Enter" => Self::Enter,
            "Space" => Self::Space,
            "Tab" => Self::Tab,
            "Escape" | "Esc" => Self::Escape,
            "Up" => Self::Up,
            "Down" => Self::Down,
            "Backspace" => Self::Backspace,
            other => Self::Text(other.to_string()),
        }
    }

    /// Name or text as understood by the automation tool
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Enter => "Enter",
            Self::Space => "Space",
            Self::Tab => "Tab",
            Self::Escape => "Escape",
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Backspace => "Backspace",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Remote-control capability the driver depends on
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a sequence of keys to the session, in order
    async fn send_keys(&self, session: &SessionId, keys: &[Key]) -> Result<()>;

    /// Capture the session's visible screen as text
    async fn snapshot(&self, session: &SessionId) -> Result<String>;

    /// Release the session
    async fn close(&self, _session: &SessionId) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_keys() {
        assert_eq!(Key::parse("Enter"), Key::Enter);
        assert_eq!(Key::parse("Esc"), Key::Escape);
        assert_eq!(Key::parse("Space"), Key::Space);
        assert_eq!(Key::parse("/connect"), Key::text("/connect"));
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(Key::Enter.as_wire(), "Enter");
        assert_eq!(Key::text("hello there").as_wire(), "hello there");
        assert_eq!(Key::Backspace.to_string(), "Backspace");
    }

    #[test]
    fn test_session_id_serializes_as_string() {
        let id = SessionId::new("abc-123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc-123\"");
        assert_eq!(id.to_string(), "abc-123");
    }
}
