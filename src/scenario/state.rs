//! Scenario states and the transitions between them

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

/// Where a scenario run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Idle,
    Connected,
    KeyPublished,
    /// Joiner only: polling for an invite
    AwaitingInvite,
    /// Host only: the peer is a contact
    ContactAdded,
    InGroup,
    MessageSent,
    AwaitingReply,
    Succeeded,
    Failed,
}

impl ScenarioState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether the scenario may move from `self` to `next`
    pub fn can_transition_to(self, next: ScenarioState) -> bool {
        use ScenarioState::*;

        matches!(
            (self, next),
            (Idle, Connected)
                | (Connected, KeyPublished)
                | (KeyPublished, AwaitingInvite)
                | (KeyPublished, ContactAdded)
                | (AwaitingInvite, InGroup)
                | (AwaitingInvite, Failed)
                | (ContactAdded, InGroup)
                | (InGroup, MessageSent)
                | (MessageSent, AwaitingReply)
                | (AwaitingReply, Succeeded)
                | (AwaitingReply, Failed)
        )
    }

    /// Move to `next`, rejecting edges that are not part of any flow
    pub fn transition(self, next: ScenarioState) -> Result<ScenarioState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::invalid_transition(self, next))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connected => "connected",
            Self::KeyPublished => "key_published",
            Self::AwaitingInvite => "awaiting_invite",
            Self::ContactAdded => "contact_added",
            Self::InGroup => "in_group",
            Self::MessageSent => "message_sent",
            Self::AwaitingReply => "awaiting_reply",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ScenarioState::*;

    #[test]
    fn test_joiner_path_is_valid() {
        let path = [
            Idle,
            Connected,
            KeyPublished,
            AwaitingInvite,
            InGroup,
            MessageSent,
            AwaitingReply,
            Succeeded,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_host_path_is_valid() {
        let path = [Idle, Connected, KeyPublished, ContactAdded, InGroup];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_only_polling_states_fail() {
        assert!(AwaitingInvite.can_transition_to(Failed));
        assert!(AwaitingReply.can_transition_to(Failed));
        assert!(!Connected.can_transition_to(Failed));
        assert!(!InGroup.can_transition_to(Failed));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for next in [Idle, Connected, InGroup, Succeeded, Failed] {
            assert!(!Succeeded.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
        assert!(Succeeded.is_terminal());
        assert!(!AwaitingReply.is_terminal());
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = Idle.transition(InGroup).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid scenario transition from idle to in_group"
        );
    }

    #[test]
    fn test_serialized_names_match_display() {
        assert_eq!(
            serde_json::to_string(&AwaitingInvite).unwrap(),
            format!("\"{}\"", AwaitingInvite)
        );
    }
}
