//! Scenario plan configuration
//!
//! A plan is read from YAML. Every field has a default, so an empty document
//! describes the reference joiner flow.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::driver::{DriverTiming, PublicKey};

/// A complete scenario plan
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ScenarioPlan {
    /// Name of the scenario
    #[serde(default = "default_name")]
    pub name: String,
    /// Optional description of what the scenario verifies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Relay address passed to `/connect`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay: Option<String>,
    /// Which side of the group this session plays
    #[serde(default)]
    pub role: Role,
    /// Chat messages exchanged with the peer
    #[serde(default)]
    pub messages: Messages,
    /// Per-operation bounds and settle delays
    #[serde(default)]
    pub timing: DriverTiming,
    /// Polling while awaiting an invite
    #[serde(default = "default_invite_poll")]
    pub invite: PollPolicy,
    /// Polling while awaiting the peer's reply
    #[serde(default = "default_reply_poll")]
    pub reply: PollPolicy,
    /// Pause after joining before the first message
    #[serde(default = "default_join_pause")]
    pub join_pause_ms: u64,
    /// Close the session through the transport when the run ends
    #[serde(default = "default_close_session")]
    pub close_session: bool,
}

/// Side of the conversation the driven client plays
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    /// Waits for an invite from the peer and accepts it
    #[default]
    Joiner,
    /// Adds the peer as a contact and creates the group
    Host {
        /// Peer's public key
        member: PublicKey,
        /// Name of the group to create
        group: String,
    },
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Joiner => "joiner",
            Self::Host { .. } => "host",
        }
    }
}

/// Messages sent and expected during the exchange
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Messages {
    /// Sent once the group is joined
    pub greeting: String,
    /// Substring that identifies the peer's reply
    pub expected_reply: String,
    /// Sent after the reply is seen
    pub confirmation: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            greeting: "Hello from dialog_tui! 👋".to_string(),
            expected_reply: "Hello from dialog_cli".to_string(),
            confirmation: "Message exchange successful! 🎉".to_string(),
        }
    }
}

/// Bounded fixed-interval polling
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of checks
    pub max_checks: u32,
    /// Wait between two checks
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
}

impl PollPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_name() -> String {
    "tui-interop".to_string()
}

fn default_interval() -> u64 {
    1000
}

fn default_invite_poll() -> PollPolicy {
    PollPolicy {
        max_checks: 30,
        interval_ms: default_interval(),
    }
}

fn default_reply_poll() -> PollPolicy {
    PollPolicy {
        max_checks: 20,
        interval_ms: default_interval(),
    }
}

fn default_join_pause() -> u64 {
    2000
}

fn default_close_session() -> bool {
    true
}

impl Default for ScenarioPlan {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: None,
            relay: None,
            role: Role::default(),
            messages: Messages::default(),
            timing: DriverTiming::default(),
            invite: default_invite_poll(),
            reply: default_reply_poll(),
            join_pause_ms: default_join_pause(),
            close_session: default_close_session(),
        }
    }
}

impl ScenarioPlan {
    /// Load and validate a plan from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read scenario plan '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a plan from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let plan: ScenarioPlan = serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse scenario plan: {}", e)))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Reject plans that could never make progress
    pub fn validate(&self) -> Result<()> {
        if self.invite.max_checks == 0 {
            return Err(Error::Config("invite.max_checks must be at least 1".to_string()));
        }
        if self.reply.max_checks == 0 {
            return Err(Error::Config("reply.max_checks must be at least 1".to_string()));
        }
        if self.messages.expected_reply.is_empty() {
            return Err(Error::Config(
                "messages.expected_reply must not be empty".to_string(),
            ));
        }
        if let Role::Host { group, .. } = &self.role {
            if group.trim().is_empty() {
                return Err(Error::Config("role.group must not be empty".to_string()));
            }
        }
        Ok(())
    }

    pub fn join_pause(&self) -> Duration {
        Duration::from_millis(self.join_pause_ms)
    }
}
