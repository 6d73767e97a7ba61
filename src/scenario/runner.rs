//! Scenario execution
//!
//! Walks a [`Driver`] through the plan one state at a time. Running out of
//! invite or reply checks ends the run with a failed outcome; a step that
//! times out or a transport fault ends it with an error.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;

use crate::common::Result;
use crate::driver::{Driver, PublicKey};
use crate::report::{Event, PollTarget, Reporter, Step};

use super::config::{PollPolicy, Role, ScenarioPlan};
use super::state::ScenarioState;

/// Why a scenario ended in the failed state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    NoInvite { checks: u32 },
    NoReply { checks: u32 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoInvite { checks } => {
                write!(f, "No invite received after {} checks", checks)
            }
            Self::NoReply { checks } => {
                write!(f, "No reply received after {} checks", checks)
            }
        }
    }
}

/// Terminal result of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed { reason: FailureReason },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Summary of a run that reached a terminal state
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub role: String,
    pub session: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKey>,
    pub invite_checks: u32,
    pub reply_checks: u32,
    pub final_state: ScenarioState,
    pub elapsed_ms: u64,
}

/// Runs one scenario plan against one driven session
pub struct ScenarioRunner {
    driver: Driver,
    plan: ScenarioPlan,
    reporter: Arc<dyn Reporter>,
    state: ScenarioState,
    invite_checks: u32,
    reply_checks: u32,
}

impl ScenarioRunner {
    pub fn new(driver: Driver, plan: ScenarioPlan, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            driver,
            plan,
            reporter,
            state: ScenarioState::Idle,
            invite_checks: 0,
            reply_checks: 0,
        }
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    /// Execute the plan to a terminal state
    ///
    /// The session is closed afterwards on every path when the plan asks
    /// for it. A failure to close is reported but never replaces the result.
    pub async fn run(mut self) -> Result<ScenarioReport> {
        let started = Instant::now();
        self.emit(Event::ScenarioStarted {
            name: self.plan.name.clone(),
            role: self.plan.role.name().to_string(),
            session: self.driver.session().id().to_string(),
        });

        let result = self.drive().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(Outcome::Succeeded) => self.emit(Event::ScenarioSucceeded {
                name: self.plan.name.clone(),
                elapsed_ms,
            }),
            Ok(Outcome::Failed { reason }) => self.emit(Event::ScenarioFailed {
                name: self.plan.name.clone(),
                state: self.state,
                reason: reason.clone(),
            }),
            Err(e) => self.emit(Event::ScenarioAborted {
                name: self.plan.name.clone(),
                state: self.state,
                error: e.to_string(),
            }),
        }

        if self.plan.close_session {
            if let Err(e) = self.driver.close().await {
                self.emit(Event::TeardownFailed {
                    error: e.to_string(),
                });
            }
        }

        let outcome = result?;
        debug_assert!(self.state.is_terminal());
        Ok(ScenarioReport {
            name: self.plan.name.clone(),
            role: self.plan.role.name().to_string(),
            session: self.driver.session().id().to_string(),
            outcome,
            public_key: self.driver.session().public_key().cloned(),
            invite_checks: self.invite_checks,
            reply_checks: self.reply_checks,
            final_state: self.state,
            elapsed_ms,
        })
    }

    async fn drive(&mut self) -> Result<Outcome> {
        self.emit(Event::step_started(Step::Connect));
        self.driver.connect(self.plan.relay.as_deref()).await?;
        self.emit(Event::step_completed(Step::Connect));
        self.advance(ScenarioState::Connected)?;

        self.emit(Event::step_started(Step::PublishKeyMaterial));
        self.driver.publish_key_material().await?;
        self.emit(Event::step_completed(Step::PublishKeyMaterial));
        self.advance(ScenarioState::KeyPublished)?;

        self.emit(Event::step_started(Step::GetPublicKey));
        let public_key = self.driver.get_public_key().await?;
        self.emit(Event::PublicKeyDiscovered { public_key });

        match self.plan.role.clone() {
            Role::Joiner => {
                self.advance(ScenarioState::AwaitingInvite)?;
                if !self.await_invite().await? {
                    self.advance(ScenarioState::Failed)?;
                    return Ok(Outcome::Failed {
                        reason: FailureReason::NoInvite {
                            checks: self.invite_checks,
                        },
                    });
                }

                self.emit(Event::step_started(Step::AcceptInvite));
                self.driver.accept_invite().await?;
                self.emit(Event::step_completed(Step::AcceptInvite));
            }
            Role::Host { member, group } => {
                self.emit(Event::StepStarted {
                    step: Step::AddContact,
                    detail: Some(member.to_string()),
                });
                self.driver.add_contact(&member).await?;
                self.emit(Event::step_completed(Step::AddContact));
                self.advance(ScenarioState::ContactAdded)?;

                self.emit(Event::StepStarted {
                    step: Step::CreateGroup,
                    detail: Some(group.clone()),
                });
                self.driver.create_group(&group).await?;
                self.emit(Event::StepCompleted {
                    step: Step::CreateGroup,
                    detail: Some(group),
                });
            }
        }
        self.advance(ScenarioState::InGroup)?;

        tokio::time::sleep(self.plan.join_pause()).await;

        let greeting = self.plan.messages.greeting.clone();
        self.send(&greeting).await?;
        self.advance(ScenarioState::MessageSent)?;

        self.advance(ScenarioState::AwaitingReply)?;
        if !self.await_reply().await? {
            self.advance(ScenarioState::Failed)?;
            return Ok(Outcome::Failed {
                reason: FailureReason::NoReply {
                    checks: self.reply_checks,
                },
            });
        }

        let confirmation = self.plan.messages.confirmation.clone();
        self.send(&confirmation).await?;
        self.advance(ScenarioState::Succeeded)?;
        Ok(Outcome::Succeeded)
    }

    /// Poll for an invite, waiting only between checks
    async fn await_invite(&mut self) -> Result<bool> {
        let policy = self.plan.invite;
        self.emit(Event::WaitStarted {
            target: PollTarget::Invite,
            max_checks: policy.max_checks,
            interval_ms: policy.interval_ms,
        });

        for attempt in 1..=policy.max_checks {
            if attempt > 1 {
                tokio::time::sleep(policy.interval()).await;
            }

            let found = self.driver.has_pending_invite().await?;
            self.record_attempt(PollTarget::Invite, policy, attempt, found);
            if found {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Fetch once, then check for the reply, fetching again between checks
    async fn await_reply(&mut self) -> Result<bool> {
        let policy = self.plan.reply;
        self.emit(Event::WaitStarted {
            target: PollTarget::Reply,
            max_checks: policy.max_checks,
            interval_ms: policy.interval_ms,
        });
        self.emit(Event::step_started(Step::RefreshMessages));
        self.driver.refresh_messages().await?;

        for attempt in 1..=policy.max_checks {
            if attempt > 1 {
                tokio::time::sleep(policy.interval()).await;
                self.driver.refresh_messages().await?;
            }

            let found = self
                .driver
                .message_was_received(&self.plan.messages.expected_reply)
                .await?;
            self.record_attempt(PollTarget::Reply, policy, attempt, found);
            if found {
                self.emit(Event::StepCompleted {
                    step: Step::RefreshMessages,
                    detail: Some(self.plan.messages.expected_reply.clone()),
                });
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn send(&mut self, text: &str) -> Result<()> {
        self.emit(Event::StepStarted {
            step: Step::SendMessage,
            detail: Some(text.to_string()),
        });
        self.driver.send_message(text).await?;
        self.emit(Event::step_completed(Step::SendMessage));
        Ok(())
    }

    fn record_attempt(&mut self, target: PollTarget, policy: PollPolicy, attempt: u32, found: bool) {
        match target {
            PollTarget::Invite => self.invite_checks = attempt,
            PollTarget::Reply => self.reply_checks = attempt,
        }
        self.emit(Event::PollAttempt {
            target,
            attempt,
            max_checks: policy.max_checks,
            found,
        });
    }

    fn advance(&mut self, next: ScenarioState) -> Result<()> {
        let from = self.state;
        self.state = from.transition(next)?;
        self.emit(Event::StateChanged { from, to: next });
        Ok(())
    }

    fn emit(&self, event: Event) {
        event.trace();
        self.reporter.report(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use crate::report::RecordingReporter;
    use crate::transport::{MockScript, MockTransport, SessionId};
    use std::time::Duration;

    fn runner_with(
        script: MockScript,
        plan: ScenarioPlan,
    ) -> (ScenarioRunner, Arc<MockTransport>, Arc<RecordingReporter>) {
        let mock = Arc::new(MockTransport::new(script));
        let reporter = Arc::new(RecordingReporter::new());
        let driver = Driver::new(mock.clone(), SessionId::new("unit"), plan.timing.clone());
        let runner = ScenarioRunner::new(driver, plan, reporter.clone());
        (runner, mock, reporter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_joiner_succeeds_on_first_checks() {
        let (runner, mock, _reporter) =
            runner_with(MockScript::default(), ScenarioPlan::default());
        let report = runner.run().await.unwrap();

        assert_eq!(report.outcome, Outcome::Succeeded);
        assert_eq!(report.final_state, ScenarioState::Succeeded);
        assert_eq!(report.invite_checks, 1);
        assert_eq!(report.reply_checks, 1);
        assert!(report.public_key.is_some());
        assert!(mock.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_polling_refreshes_between_checks() {
        let (runner, mock, _reporter) = runner_with(
            MockScript::default().with_reply_on_fetch(4),
            ScenarioPlan::default(),
        );
        let report = runner.run().await.unwrap();

        assert_eq!(report.reply_checks, 4);
        assert_eq!(mock.fetch_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_reply_is_failed_outcome() {
        let (runner, mock, reporter) =
            runner_with(MockScript::default().never_reply(), ScenarioPlan::default());
        let report = runner.run().await.unwrap();

        assert_eq!(
            report.outcome,
            Outcome::Failed {
                reason: FailureReason::NoReply { checks: 20 }
            }
        );
        assert_eq!(report.final_state, ScenarioState::Failed);
        assert_eq!(mock.fetch_count(), 20);
        // Confirmation is only sent after a reply
        assert_eq!(mock.count_submitted("Message exchange"), 0);
        assert_eq!(reporter.kinds().last(), Some(&"scenario_failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_error_aborts_and_tears_down() {
        let (runner, mock, reporter) = runner_with(
            MockScript::default().with_public_key("not a key"),
            ScenarioPlan::default(),
        );
        let err = runner.run().await.unwrap_err();

        assert!(matches!(err, Error::ExtractionFailed));
        assert!(mock.is_closed());
        assert_eq!(mock.invite_checks(), 0);
        assert_eq!(reporter.kinds().last(), Some(&"scenario_aborted"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_session_skips_teardown() {
        let plan = ScenarioPlan {
            close_session: false,
            ..ScenarioPlan::default()
        };
        let (runner, mock, _reporter) = runner_with(MockScript::default(), plan);
        runner.run().await.unwrap();
        assert!(!mock.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_pause_precedes_greeting() {
        let plan = ScenarioPlan {
            join_pause_ms: 7000,
            ..ScenarioPlan::default()
        };
        let (runner, _mock, _reporter) = runner_with(MockScript::default(), plan);
        let start = Instant::now();
        let report = runner.run().await.unwrap();

        // pk settle, invite check, accept settle, join pause,
        // greeting, initial fetch, confirmation
        let expected = Duration::from_millis(1000 + 1000 + 1000 + 7000 + 1000 + 2000 + 1000);
        assert_eq!(start.elapsed(), expected);
        assert_eq!(report.elapsed_ms, expected.as_millis() as u64);
    }
}
