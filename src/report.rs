//! Structured progress events
//!
//! Every scenario step produces an [`Event`]. Events carry a level, a
//! human-readable message and typed fields, and are delivered to a
//! [`Reporter`] as well as mirrored into `tracing`.

use std::fmt;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

use colored::Colorize;
use serde::Serialize;

use crate::driver::PublicKey;
use crate::scenario::{FailureReason, ScenarioState};

/// Severity of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// Driver operation a step event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Connect,
    PublishKeyMaterial,
    GetPublicKey,
    AddContact,
    CreateGroup,
    AcceptInvite,
    SendMessage,
    RefreshMessages,
}

impl Step {
    fn started(self) -> &'static str {
        match self {
            Self::Connect => "Connecting to relay...",
            Self::PublishKeyMaterial => "Publishing key packages...",
            Self::GetPublicKey => "Getting public key...",
            Self::AddContact => "Adding contact...",
            Self::CreateGroup => "Creating group...",
            Self::AcceptInvite => "Accepting invite...",
            Self::SendMessage => "Sending message...",
            Self::RefreshMessages => "Fetching messages...",
        }
    }

    fn completed(self) -> &'static str {
        match self {
            Self::Connect => "Connected to relay",
            Self::PublishKeyMaterial => "Key packages published",
            Self::GetPublicKey => "Public key retrieved",
            Self::AddContact => "Contact added",
            Self::CreateGroup => "Group created",
            Self::AcceptInvite => "Invite accepted",
            Self::SendMessage => "Message sent",
            Self::RefreshMessages => "Messages fetched",
        }
    }
}

/// What a polling loop is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollTarget {
    Invite,
    Reply,
}

impl fmt::Display for PollTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invite => f.write_str("invite"),
            Self::Reply => f.write_str("reply"),
        }
    }
}

/// A single progress or outcome event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    ScenarioStarted {
        name: String,
        role: String,
        session: String,
    },
    StateChanged {
        from: ScenarioState,
        to: ScenarioState,
    },
    StepStarted {
        step: Step,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    StepCompleted {
        step: Step,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    PublicKeyDiscovered {
        public_key: PublicKey,
    },
    WaitStarted {
        target: PollTarget,
        max_checks: u32,
        interval_ms: u64,
    },
    PollAttempt {
        target: PollTarget,
        attempt: u32,
        max_checks: u32,
        found: bool,
    },
    ScenarioSucceeded {
        name: String,
        elapsed_ms: u64,
    },
    ScenarioFailed {
        name: String,
        state: ScenarioState,
        reason: FailureReason,
    },
    ScenarioAborted {
        name: String,
        state: ScenarioState,
        error: String,
    },
    TeardownFailed {
        error: String,
    },
}

impl Event {
    pub fn step_started(step: Step) -> Self {
        Self::StepStarted { step, detail: None }
    }

    pub fn step_completed(step: Step) -> Self {
        Self::StepCompleted { step, detail: None }
    }

    pub fn level(&self) -> Level {
        match self {
            Self::StateChanged { .. } | Self::PollAttempt { .. } => Level::Debug,
            Self::ScenarioStarted { .. }
            | Self::StepStarted { .. }
            | Self::StepCompleted { .. }
            | Self::PublicKeyDiscovered { .. }
            | Self::WaitStarted { .. }
            | Self::ScenarioSucceeded { .. } => Level::Info,
            Self::TeardownFailed { .. } => Level::Warn,
            Self::ScenarioFailed { .. } | Self::ScenarioAborted { .. } => Level::Error,
        }
    }

    /// Stable snake_case name, same as the serialized `event` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScenarioStarted { .. } => "scenario_started",
            Self::StateChanged { .. } => "state_changed",
            Self::StepStarted { .. } => "step_started",
            Self::StepCompleted { .. } => "step_completed",
            Self::PublicKeyDiscovered { .. } => "public_key_discovered",
            Self::WaitStarted { .. } => "wait_started",
            Self::PollAttempt { .. } => "poll_attempt",
            Self::ScenarioSucceeded { .. } => "scenario_succeeded",
            Self::ScenarioFailed { .. } => "scenario_failed",
            Self::ScenarioAborted { .. } => "scenario_aborted",
            Self::TeardownFailed { .. } => "teardown_failed",
        }
    }

    /// Emit the event through `tracing` at its level
    pub fn trace(&self) {
        let kind = self.kind();
        match self.level() {
            Level::Debug => tracing::debug!(event = kind, "{}", self),
            Level::Info => tracing::info!(event = kind, "{}", self),
            Level::Warn => tracing::warn!(event = kind, "{}", self),
            Level::Error => tracing::error!(event = kind, "{}", self),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScenarioStarted {
                name,
                role,
                session,
            } => write!(f, "Scenario '{}' started as {} on session {}", name, role, session),
            Self::StateChanged { from, to } => write!(f, "State {} -> {}", from, to),
            Self::StepStarted { step, detail } => match detail {
                Some(detail) => write!(f, "{} {}", step.started(), detail),
                None => f.write_str(step.started()),
            },
            Self::StepCompleted { step, detail } => match detail {
                Some(detail) => write!(f, "{}: {}", step.completed(), detail),
                None => f.write_str(step.completed()),
            },
            Self::PublicKeyDiscovered { public_key } => write!(f, "Public key: {}", public_key),
            Self::WaitStarted {
                target: PollTarget::Invite,
                max_checks,
                ..
            } => write!(f, "Waiting for group invitations (up to {} checks)...", max_checks),
            Self::WaitStarted {
                target: PollTarget::Reply,
                max_checks,
                ..
            } => write!(f, "Waiting for a reply (up to {} checks)...", max_checks),
            Self::PollAttempt {
                target,
                attempt,
                max_checks,
                found,
            } => write!(
                f,
                "Check {}/{} for {}: {}",
                attempt,
                max_checks,
                target,
                if *found { "found" } else { "not yet" }
            ),
            Self::ScenarioSucceeded { name, elapsed_ms } => write!(
                f,
                "Interoperability test '{}' successful after {:.1}s",
                name,
                *elapsed_ms as f64 / 1000.0
            ),
            Self::ScenarioFailed { name, reason, .. } => {
                write!(f, "Interoperability test '{}' failed: {}", name, reason)
            }
            Self::ScenarioAborted { name, state, error } => write!(
                f,
                "Error during '{}' while {}: {}",
                name, state, error
            ),
            Self::TeardownFailed { error } => write!(f, "Failed to close session: {}", error),
        }
    }
}

/// Receives scenario events
pub trait Reporter: Send + Sync {
    fn report(&self, event: &Event);
}

/// Human-readable status lines with glyphs
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: &Event) {
        let message = event.to_string();
        match event {
            Event::ScenarioStarted { name, role, .. } => {
                println!(
                    "\n{} {} {}",
                    "Running Scenario:".blue().bold(),
                    name.white().bold(),
                    format!("({})", role).dimmed()
                );
            }
            Event::StepStarted { .. } | Event::WaitStarted { .. } => {
                println!("{}", message.cyan())
            }
            Event::StepCompleted { .. } | Event::PublicKeyDiscovered { .. } => {
                println!("  {} {}", "✓".green(), message);
            }
            Event::StateChanged { .. } | Event::PollAttempt { .. } => {
                if self.verbose {
                    println!("  {} {}", "·".dimmed(), message.dimmed());
                }
            }
            Event::ScenarioSucceeded { .. } => {
                println!("\n{} {}\n", "✓".green().bold(), message.green().bold());
            }
            Event::ScenarioFailed { .. } | Event::ScenarioAborted { .. } => {
                println!("\n{} {}\n", "✗".red().bold(), message.red().bold());
            }
            Event::TeardownFailed { .. } => println!("  {} {}", "⚠".yellow(), message),
        }
    }
}

/// One JSON object per event on stdout
#[derive(Debug, Default)]
pub struct JsonReporter;

impl JsonReporter {
    /// JSON form of an event: its fields plus `event`, `level` and `message`
    pub fn to_json(event: &Event) -> serde_json::Value {
        let mut value = serde_json::to_value(event).unwrap_or_else(|e| {
            serde_json::json!({ "event": event.kind(), "serialization_error": e.to_string() })
        });
        if let Some(object) = value.as_object_mut() {
            object.insert("level".to_string(), serde_json::json!(event.level()));
            object.insert("message".to_string(), serde_json::json!(event.to_string()));
        }
        value
    }
}

impl Reporter for JsonReporter {
    fn report(&self, event: &Event) {
        let line = Self::to_json(event).to_string();
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", line) {
            tracing::warn!("Failed to write event: {}", e);
        }
    }
}

/// Keeps events in memory, for assertions and post-run inspection
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Event>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Event kinds in order, skipping debug-level events
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .filter(|e| e.level() > Level::Debug)
            .map(Event::kind)
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let event = Event::PollAttempt {
            target: PollTarget::Invite,
            attempt: 3,
            max_checks: 30,
            found: true,
        };
        let json = JsonReporter::to_json(&event);

        assert_eq!(json["event"], "poll_attempt");
        assert_eq!(json["level"], "debug");
        assert_eq!(json["target"], "invite");
        assert_eq!(json["attempt"], 3);
        assert_eq!(json["found"], true);
        assert_eq!(json["message"], "Check 3/30 for invite: found");
    }

    #[test]
    fn test_failure_event_carries_reason() {
        let event = Event::ScenarioFailed {
            name: "interop".to_string(),
            state: ScenarioState::AwaitingInvite,
            reason: FailureReason::NoInvite { checks: 30 },
        };
        let json = JsonReporter::to_json(&event);

        assert_eq!(json["level"], "error");
        assert_eq!(json["state"], "awaiting_invite");
        assert_eq!(json["reason"]["kind"], "no_invite");
        assert_eq!(json["reason"]["checks"], 30);
    }

    #[test]
    fn test_kind_matches_serialized_tag() {
        let events = [
            Event::step_started(Step::Connect),
            Event::TeardownFailed {
                error: "gone".to_string(),
            },
            Event::StateChanged {
                from: ScenarioState::Idle,
                to: ScenarioState::Connected,
            },
        ];
        for event in &events {
            assert_eq!(JsonReporter::to_json(event)["event"], event.kind());
        }
    }

    #[test]
    fn test_wait_started_is_visible_by_default() {
        let event = Event::WaitStarted {
            target: PollTarget::Invite,
            max_checks: 30,
            interval_ms: 1000,
        };
        assert_eq!(event.level(), Level::Info);
        assert_eq!(
            event.to_string(),
            "Waiting for group invitations (up to 30 checks)..."
        );

        let json = JsonReporter::to_json(&event);
        assert_eq!(json["event"], "wait_started");
        assert_eq!(json["target"], "invite");
        assert_eq!(json["interval_ms"], 1000);
    }

    #[test]
    fn test_step_detail_in_message() {
        let event = Event::StepStarted {
            step: Step::SendMessage,
            detail: Some("hi".to_string()),
        };
        assert_eq!(event.to_string(), "Sending message... hi");
        assert_eq!(Event::step_completed(Step::Connect).to_string(), "Connected to relay");
    }

    #[test]
    fn test_recording_reporter_filters_debug_kinds() {
        let reporter = RecordingReporter::new();
        reporter.report(&Event::StateChanged {
            from: ScenarioState::Idle,
            to: ScenarioState::Connected,
        });
        reporter.report(&Event::step_completed(Step::Connect));

        assert_eq!(reporter.events().len(), 2);
        assert_eq!(reporter.kinds(), vec!["step_completed"]);
    }
}
