//! In-memory stand-in for a remote-controlled chat TUI
//!
//! Interprets submitted slash commands the way the chat client does and
//! renders the matching status lines, so a whole scenario can be dry-run
//! without a terminal. The script decides when an invite shows up, when the
//! peer's reply arrives and which command should fail.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::common::{Error, Result};

use super::{Key, SessionId, Transport};

/// Behavior of the simulated client
#[derive(Debug, Clone)]
pub struct MockScript {
    /// Text printed after `Hex: ` by `/pk`
    pub public_key: String,
    /// `/invites` call (1-based) from which an invite is pending
    pub invite_on_check: Option<u32>,
    /// `/fetch` call (1-based) from which the peer's reply is shown
    pub reply_on_fetch: Option<u32>,
    /// Name shown in front of the peer's reply
    pub peer_name: String,
    /// Body of the peer's reply
    pub reply_text: String,
    /// Submitting a line with this prefix makes `send_keys` fail
    pub fail_on: Option<String>,
    /// Number of most recent lines visible in a snapshot
    pub screen_height: usize,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            public_key: "3bf0c63fcb93463407af97a5e5ee64fa883d107ef9e558472c4eb9aaaefa459d"
                .to_string(),
            invite_on_check: Some(1),
            reply_on_fetch: Some(1),
            peer_name: "dialog_cli".to_string(),
            reply_text: "Hello from dialog_cli".to_string(),
            fail_on: None,
            screen_height: 24,
        }
    }
}

impl MockScript {
    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = public_key.into();
        self
    }

    pub fn with_invite_on_check(mut self, check: u32) -> Self {
        self.invite_on_check = Some(check);
        self
    }

    pub fn never_invite(mut self) -> Self {
        self.invite_on_check = None;
        self
    }

    pub fn with_reply_on_fetch(mut self, fetch: u32) -> Self {
        self.reply_on_fetch = Some(fetch);
        self
    }

    pub fn never_reply(mut self) -> Self {
        self.reply_on_fetch = None;
        self
    }

    pub fn with_reply_text(mut self, text: impl Into<String>) -> Self {
        self.reply_text = text.into();
        self
    }

    pub fn failing_on(mut self, prefix: impl Into<String>) -> Self {
        self.fail_on = Some(prefix.into());
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    lines: Vec<String>,
    input: String,
    submitted: Vec<String>,
    invite_checks: u32,
    fetches: u32,
    snapshots: u32,
    invite_pending: bool,
    pending_group: Option<String>,
    member_selected: bool,
    closed: bool,
}

/// Simulated session driven entirely in memory
#[derive(Debug)]
pub struct MockTransport {
    script: MockScript,
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new(script: MockScript) -> Self {
        Self {
            script,
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every submitted line in order (a bare Enter records an empty line)
    pub fn submitted(&self) -> Vec<String> {
        self.state().submitted.clone()
    }

    /// Number of submitted lines starting with `prefix`
    pub fn count_submitted(&self, prefix: &str) -> usize {
        self.state()
            .submitted
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    pub fn invite_checks(&self) -> u32 {
        self.state().invite_checks
    }

    pub fn fetch_count(&self) -> u32 {
        self.state().fetches
    }

    pub fn snapshot_count(&self) -> u32 {
        self.state().snapshots
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn submit(&self, state: &mut MockState) -> Result<()> {
        let line = std::mem::take(&mut state.input);
        state.submitted.push(line.clone());

        if let Some(prefix) = &self.script.fail_on {
            if line.starts_with(prefix.as_str()) {
                return Err(Error::transport(
                    "send-keys",
                    format!("simulated failure on '{}'", line),
                ));
            }
        }

        let command = line.split_whitespace().next().unwrap_or("");
        match command {
            "" => {
                if let Some(group) = state.pending_group.take() {
                    if std::mem::take(&mut state.member_selected) {
                        state
                            .lines
                            .push(format!("Group '{}' created successfully", group));
                    } else {
                        state.lines.push("No members selected".to_string());
                    }
                } else if std::mem::take(&mut state.invite_pending) {
                    state.lines.push("Successfully joined group".to_string());
                }
            }
            "/connect" => state.lines.push("● Connected".to_string()),
            "/keypackage" => state.lines.push("Key package Published".to_string()),
            "/pk" => {
                state.lines.push("Your public key:".to_string());
                state.lines.push(format!("Hex: {}", self.script.public_key));
            }
            "/invites" => {
                state.invite_checks += 1;
                let due = self
                    .script
                    .invite_on_check
                    .is_some_and(|check| state.invite_checks >= check);
                if due {
                    state.invite_pending = true;
                    state
                        .lines
                        .push("1 pending invite (press Enter to accept)".to_string());
                } else {
                    state.lines.push("No invitations".to_string());
                }
            }
            "/fetch" => {
                state.fetches += 1;
                let due = self
                    .script
                    .reply_on_fetch
                    .is_some_and(|fetch| state.fetches >= fetch);
                if due {
                    state
                        .lines
                        .push(format!("{}: {}", self.script.peer_name, self.script.reply_text));
                } else {
                    state.lines.push("No new messages".to_string());
                }
            }
            "/add" => state.lines.push("Contact added".to_string()),
            "/create" => {
                let name = line
                    .split_once(' ')
                    .map(|(_, rest)| rest.trim())
                    .unwrap_or("")
                    .to_string();
                state.pending_group = Some(name);
                state
                    .lines
                    .push("Select members (Space to toggle, Enter to confirm)".to_string());
            }
            _ if command.starts_with('/') => {
                state.lines.push(format!("Unknown command: {}", command));
            }
            _ => state.lines.push(format!("You: {}", line)),
        }

        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new(MockScript::default())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_keys(&self, _session: &SessionId, keys: &[Key]) -> Result<()> {
        let mut state = self.state();
        if state.closed {
            return Err(Error::transport("send-keys", "session closed"));
        }

        for key in keys {
            match key {
                Key::Text(text) => state.input.push_str(text),
                Key::Space if state.pending_group.is_some() => state.member_selected = true,
                Key::Space => state.input.push(' '),
                Key::Backspace => {
                    state.input.pop();
                }
                Key::Enter => self.submit(&mut state)?,
                Key::Tab | Key::Escape | Key::Up | Key::Down => {}
            }
        }

        Ok(())
    }

    async fn snapshot(&self, _session: &SessionId) -> Result<String> {
        let mut state = self.state();
        if state.closed {
            return Err(Error::transport("snapshot", "session closed"));
        }
        state.snapshots += 1;

        let start = state.lines.len().saturating_sub(self.script.screen_height);
        Ok(state.lines[start..].join("\n"))
    }

    async fn close(&self, _session: &SessionId) -> Result<()> {
        self.state().closed = true;
        Ok(())
    }
}
